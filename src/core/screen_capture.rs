use crate::core::backend::Rect;
use image::{Rgb, RgbImage};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};

/// Capture a screen-space rectangle using BitBlt from the desktop DC.
/// Captures visible pixels, so the control must not be covered.
pub fn capture_screen_rect(rect: Rect) -> Result<RgbImage, String> {
    let width = rect.width();
    let height = rect.height();
    if width <= 0 || height <= 0 {
        return Err(format!("Empty capture region {}x{}", width, height));
    }

    unsafe {
        let desktop = HWND(0);
        let hdc = GetDC(desktop);
        if hdc.is_invalid() {
            return Err("Failed to get screen device context".to_string());
        }

        let mem_dc = CreateCompatibleDC(hdc);
        if mem_dc.is_invalid() {
            let _ = ReleaseDC(desktop, hdc);
            return Err("Failed to create compatible DC".to_string());
        }

        let bitmap = CreateCompatibleBitmap(hdc, width, height);
        if bitmap.is_invalid() {
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(desktop, hdc);
            return Err("Failed to create compatible bitmap".to_string());
        }

        let old_bitmap = SelectObject(mem_dc, bitmap);

        let blit = BitBlt(mem_dc, 0, 0, width, height, hdc, rect.left, rect.top, SRCCOPY);
        if blit.is_err() {
            let _ = SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(desktop, hdc);
            return Err("BitBlt failed - could not capture control".to_string());
        }

        // 32 bits per pixel keeps rows free of DWORD padding
        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height, // Negative for top-down bitmap
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0 as u32,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default(); 1],
        };

        let mut buffer: Vec<u8> = vec![0; (width * height * 4) as usize];
        let scan_lines = GetDIBits(
            mem_dc,
            bitmap,
            0,
            height as u32,
            Some(buffer.as_mut_ptr() as *mut _),
            &mut bmi,
            DIB_RGB_COLORS,
        );

        let _ = SelectObject(mem_dc, old_bitmap);
        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        let _ = ReleaseDC(desktop, hdc);

        if scan_lines == 0 {
            return Err("Failed to get bitmap bits".to_string());
        }

        Ok(bgra_to_rgb(&buffer, width as u32, height as u32))
    }
}

/// Windows hands back BGRA rows; drop alpha and swap to RGB
fn bgra_to_rgb(buffer: &[u8], width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let idx = ((y * width + x) * 4) as usize;
        Rgb([buffer[idx + 2], buffer[idx + 1], buffer[idx]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_bgra_rows() {
        let buffer = [1, 2, 3, 255, 10, 20, 30, 255];
        let img = bgra_to_rgb(&buffer, 2, 1);
        assert_eq!(img.get_pixel(0, 0), &Rgb([3, 2, 1]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([30, 20, 10]));
    }
}
