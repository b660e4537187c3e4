mod automation;
mod cli;
mod core;
mod error;
mod logging;
mod settings;
mod telemetry;

use std::process::ExitCode;
use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use automation::bridge::{Bridge, RunOutcome, RunRequest};
use automation::classifier::{ReferenceFingerprints, StateClassifier};
use automation::session::IndicatorLocator;
use automation::Timing;
use cli::Cli;
use error::{BridgeError, EXIT_FAILURE};
use settings::SessionConfig;
use telemetry::PerfLog;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.debug);

    let perf = Rc::new(PerfLog::new(cli.debug));
    let code = match run(&cli, &perf) {
        Ok(outcome) => {
            println!("{}", outcome);
            0
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            err.downcast_ref::<BridgeError>()
                .map(BridgeError::exit_code)
                .unwrap_or(EXIT_FAILURE)
        }
    };

    match perf.save(&cli.timings) {
        Ok(0) => {}
        Ok(_) => eprintln!("Performance timings saved to {}", cli.timings.display()),
        Err(e) => eprintln!("Failed to save timings: {}", e),
    }

    ExitCode::from(code as u8)
}

fn run(cli: &Cli, perf: &Rc<PerfLog>) -> Result<RunOutcome> {
    let references = {
        let _scope = perf.scope("load_references");
        ReferenceFingerprints::load(&cli.refs)
    };
    if references.loaded() == 0 {
        warn!(
            dir = %cli.refs.display(),
            "no reference images loaded, every reading will be UNKNOWN"
        );
    }
    let config = {
        let _scope = perf.scope("load_config");
        SessionConfig::load(&cli.config)?
    };
    let request = RunRequest {
        prompt: cli.resolve_prompt()?,
        bezi_path: cli.bezi_path.clone(),
        init: cli.init,
    };

    let backend = core::platform_backend()?;
    let mut bridge = Bridge::new(
        backend,
        StateClassifier::new(references, perf.clone()),
        config,
        cli.config.clone(),
        Timing::default(),
        perf.clone(),
    );
    if let Some(id) = &cli.indicator_id {
        bridge = bridge.with_locator(IndicatorLocator::ByAutomationId(id.clone()));
    }
    Ok(bridge.run(&request)?)
}
