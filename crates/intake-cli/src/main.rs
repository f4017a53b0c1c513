use std::env;
use std::error::Error;
use std::fs;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use intake_core::schema::step_schema;
use intake_core::EntryParams;
use intake_core::FileWizardStore;
use intake_core::IntakeConfig;
use intake_core::Persona;
use intake_core::SubmissionState;
use intake_core::UserAction;
use intake_core::WizardData;
use intake_core::WizardStep;
use intake_core::WizardStore;
use intake_exec::AnalysisService;
use intake_exec::HttpAnalysisService;
use intake_exec::SimulatedAnalysisService;
use intake_exec::WizardController;
use serde::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::io::Stdin;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::ui::Answer;

mod ui;

type CliResult<T> = Result<T, Box<dyn Error>>;
type Controller = WizardController<dyn AnalysisService, FileWizardStore>;
type Input = Lines<BufReader<Stdin>>;

const SESSION_DIR_NAME: &str = "intake-session";

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run() -> CliResult<()> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };
    let rest = args.collect::<Vec<_>>();

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("intake {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "run" => runtime()?.block_on(run_wizard(Args::parse(rest)?)),
        "scenarios" => runtime()?.block_on(list_scenarios(Args::parse(rest)?)),
        "pick" => runtime()?.block_on(pick_scenario(Args::parse(rest)?)),
        "status" => show_status(&Args::parse(rest)?),
        "restart" => clear_progress(&Args::parse(rest)?),
        _ => {
            print_help();
            Err(format!("unknown command: {command}").into())
        }
    }
}

fn runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    offline: bool,
    persona: Option<Persona>,
    demo: bool,
    scenario: Option<String>,
    report: Option<PathBuf>,
    positional: Vec<String>,
}

impl Args {
    fn parse(args: Vec<String>) -> CliResult<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => parsed.config = Some(PathBuf::from(value_of(&mut args, "--config")?)),
                "--offline" => parsed.offline = true,
                "--demo" => parsed.demo = true,
                "--persona" => {
                    let value = value_of(&mut args, "--persona")?;
                    let Some(persona) = Persona::parse(&value) else {
                        return Err(format!("unknown persona: {value}").into());
                    };
                    parsed.persona = Some(persona);
                }
                "--scenario" => parsed.scenario = Some(value_of(&mut args, "--scenario")?),
                "--report" => parsed.report = Some(PathBuf::from(value_of(&mut args, "--report")?)),
                flag if flag.starts_with("--") => {
                    return Err(format!("unsupported argument: {flag}").into());
                }
                other => parsed.positional.push(other.to_string()),
            }
        }
        Ok(parsed)
    }

    fn entry_params(&self) -> EntryParams {
        EntryParams {
            persona: self.persona,
            demo: self.demo,
            scenario: self.scenario.clone(),
        }
    }
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> CliResult<String> {
    match args.next() {
        Some(value) => Ok(value),
        None => Err(format!("{flag} requires a value").into()),
    }
}

struct Context {
    config: IntakeConfig,
    store: FileWizardStore,
    service: Arc<dyn AnalysisService>,
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("intake")
        .join("config.toml")
}

fn load_config(args: &Args) -> CliResult<IntakeConfig> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    Ok(IntakeConfig::load(&path)?.apply_env())
}

fn open_store(config: &IntakeConfig) -> CliResult<FileWizardStore> {
    let state_dir = config
        .storage
        .state_dir
        .clone()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("intake")))
        .unwrap_or_else(|| PathBuf::from(".intake"));
    let session_dir = config
        .storage
        .session_dir
        .clone()
        .unwrap_or_else(|| env::temp_dir().join(SESSION_DIR_NAME));
    Ok(FileWizardStore::open(state_dir, session_dir)?)
}

fn context(args: &Args) -> CliResult<Context> {
    let config = load_config(args)?;
    let store = open_store(&config)?;
    let service: Arc<dyn AnalysisService> = if args.offline {
        Arc::new(SimulatedAnalysisService::with_latency(Duration::from_millis(
            250,
        )))
    } else {
        Arc::new(HttpAnalysisService::new(&config.service)?)
    };
    tracing::debug!(
        offline = args.offline,
        base_url = %config.service.base_url,
        progress = %store.progress_path().display(),
        "context ready"
    );
    Ok(Context {
        config,
        store,
        service,
    })
}

async fn run_wizard(args: Args) -> CliResult<()> {
    let Context {
        config,
        store,
        service,
    } = context(&args)?;

    let mut handoff = None;
    if args.demo && !store.handoff_path().exists() {
        if let (Some(persona), Some(name)) = (args.persona, args.scenario.as_deref()) {
            let catalog = service.demo_scenarios().await?;
            handoff = catalog.handoff(persona, name);
            if handoff.is_none() {
                return Err(format!("no {} scenario named {name}", persona.as_str()).into());
            }
        }
    }

    let mut controller: Controller =
        WizardController::new(service, store, config).with_observer(ui::progress_observer());
    controller.enter_with(args.entry_params(), handoff).await;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let outcome = drive(&mut controller, &mut input).await;
    controller.shutdown();
    outcome?;

    if controller.session().is_complete() {
        if let Some(path) = &args.report {
            save_report(&controller, path).await?;
        }
    }
    Ok(())
}

async fn drive(controller: &mut Controller, input: &mut Input) -> CliResult<()> {
    let session = controller.session();
    if session.current_step == WizardStep::Persona && session.auto_advance_pending {
        println!(
            "Loading demo scenario {}...",
            session
                .demo_scenario
                .as_ref()
                .map_or("", |scenario| scenario.display_name())
        );
        controller.pump().await;
    }

    'wizard: loop {
        controller.pump_ready().await;
        let step = controller.session().current_step;

        match step {
            WizardStep::Results => {
                if let Some(view) = &controller.session().result {
                    ui::print_results(view);
                }
                return Ok(());
            }
            WizardStep::Persona => {
                ui::print_header(controller.session());
                let Some(line) = prompt(controller, input, &ui::persona_prompt()).await? else {
                    return Ok(());
                };
                match ui::parse_answer(&line) {
                    Answer::Quit => return Ok(()),
                    Answer::Restart => controller.dispatch(UserAction::Restart).await,
                    Answer::Back => {}
                    Answer::Keep => controller.dispatch(UserAction::Next).await,
                    Answer::Value(raw) => match ui::parse_persona(&raw) {
                        Some(persona) => {
                            controller.dispatch(UserAction::SelectPersona(persona)).await;
                            controller.dispatch(UserAction::Next).await;
                        }
                        None => println!("Unknown choice: {raw}"),
                    },
                }
            }
            WizardStep::CompanyDetails | WizardStep::AiSystemDetails => {
                let failed = match &controller.session().submission {
                    SubmissionState::Failed { error, .. } if step == WizardStep::AiSystemDetails => {
                        Some(error.clone())
                    }
                    _ => None,
                };
                if let Some(error) = failed {
                    ui::print_failure(&error);
                    let question = "Press enter to retry, type `edit` to change answers";
                    let Some(line) = prompt(controller, input, question).await? else {
                        return Ok(());
                    };
                    match ui::parse_answer(&line) {
                        Answer::Keep => {
                            controller.dispatch(UserAction::Retry).await;
                            continue 'wizard;
                        }
                        Answer::Back => {
                            controller.dispatch(UserAction::Previous).await;
                            continue 'wizard;
                        }
                        Answer::Restart => {
                            controller.dispatch(UserAction::Restart).await;
                            continue 'wizard;
                        }
                        Answer::Quit => return Ok(()),
                        Answer::Value(_) => {}
                    }
                }

                ui::print_header(controller.session());
                for spec in step_schema(step).fields {
                    let current = controller.session().form.get(spec.name).cloned();
                    let text = ui::field_prompt(spec, current.as_ref());
                    let Some(line) = prompt(controller, input, &text).await? else {
                        return Ok(());
                    };
                    match ui::parse_answer(&line) {
                        Answer::Keep => {}
                        Answer::Value(raw) => {
                            let value = ui::field_value(spec, &raw);
                            controller
                                .dispatch(UserAction::SetField {
                                    name: spec.name.to_string(),
                                    value: value.clone(),
                                })
                                .await;
                            if controller.session().form.get(spec.name) != Some(&value) {
                                println!("`{raw}` is not a valid choice for {}", spec.label);
                            }
                        }
                        Answer::Back => {
                            controller.dispatch(UserAction::Previous).await;
                            continue 'wizard;
                        }
                        Answer::Restart => {
                            controller.dispatch(UserAction::Restart).await;
                            continue 'wizard;
                        }
                        Answer::Quit => return Ok(()),
                    }
                }
                if step == WizardStep::AiSystemDetails {
                    println!("Analyzing...");
                }
                controller.dispatch(UserAction::Next).await;
            }
        }
    }
}

/// Reads one line while keeping deferred work (auto-save) flowing.
async fn prompt(
    controller: &mut Controller,
    input: &mut Input,
    text: &str,
) -> CliResult<Option<String>> {
    print!("{text}: ");
    io::stdout().flush()?;
    loop {
        tokio::select! {
            line = input.next_line() => return Ok(line?),
            Some(action) = controller.next_deferred() => controller.dispatch(action).await,
        }
    }
}

async fn save_report(controller: &Controller, path: &Path) -> CliResult<()> {
    let Some(report) = controller.download_report().await else {
        return Err("no completed analysis to report on".into());
    };
    fs::write(path, report?)?;
    println!("Report written to {}", path.display());
    Ok(())
}

async fn list_scenarios(args: Args) -> CliResult<()> {
    let Context { service, .. } = context(&args)?;
    let catalog = service.demo_scenarios().await?;
    if catalog.is_empty() {
        println!("No demo scenarios available.");
        return Ok(());
    }
    ui::print_catalog(&catalog, args.persona);
    Ok(())
}

async fn pick_scenario(args: Args) -> CliResult<()> {
    let mut positional = args.positional.iter();
    let persona = match args.persona {
        Some(persona) => Some(persona),
        None => positional.next().and_then(|raw| Persona::parse(raw)),
    };
    let Some(persona) = persona else {
        return Err("usage: intake pick PERSONA SCENARIO".into());
    };
    let name = positional.cloned().collect::<Vec<_>>().join(" ");
    let name = args.scenario.clone().unwrap_or(name);
    if name.trim().is_empty() {
        return Err("usage: intake pick PERSONA SCENARIO".into());
    }

    let Context {
        mut store, service, ..
    } = context(&args)?;
    let catalog = service.demo_scenarios().await?;
    let Some(handoff) = catalog.handoff(persona, &name) else {
        return Err(format!("no {} scenario named {name}", persona.as_str()).into());
    };
    store.put_handoff(&handoff)?;
    println!(
        "Picked {} for the {} perspective.",
        handoff.scenario.display_name(),
        persona.label()
    );
    println!("Start it with: intake run --demo --persona {}", persona.as_str());
    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    progress_file: String,
    resume_step: u8,
    persona: Option<Persona>,
    saved_at: Option<String>,
    demo_pending: bool,
    data: &'a WizardData,
}

fn show_status(args: &Args) -> CliResult<()> {
    let config = load_config(args)?;
    let mut store = open_store(&config)?;
    let snapshot = store.load();
    if snapshot.is_empty() {
        println!("No saved progress.");
        return Ok(());
    }
    let report = StatusReport {
        progress_file: store.progress_path().display().to_string(),
        resume_step: snapshot.resume_step().number(),
        persona: snapshot.persona(),
        saved_at: snapshot.saved_at().map(|at| at.to_rfc3339()),
        demo_pending: store.handoff_path().exists(),
        data: &snapshot.data,
    };
    print!("{}", serde_yaml::to_string(&report)?);
    Ok(())
}

fn clear_progress(args: &Args) -> CliResult<()> {
    let config = load_config(args)?;
    let mut store = open_store(&config)?;
    store.clear()?;
    println!("Saved progress cleared.");
    Ok(())
}

fn print_help() {
    println!("intake {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  intake run [--persona NAME] [--demo] [--scenario NAME] [--report PATH]");
    println!("  intake scenarios [--persona NAME]");
    println!("  intake pick PERSONA SCENARIO");
    println!("  intake status");
    println!("  intake restart");
    println!("  intake --help");
    println!("  intake --version");
    println!();
    println!("Common flags: --config PATH, --offline");
    println!("At any prompt: :back, :restart, :quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn run_flags_build_entry_params() {
        let parsed = Args::parse(args(&[
            "--persona",
            "Entrepreneur",
            "--demo",
            "--scenario",
            "TechStart Pro",
            "--offline",
        ]))
        .expect("parse");
        assert!(parsed.offline);
        assert_eq!(
            parsed.entry_params(),
            EntryParams {
                persona: Some(Persona::Entrepreneur),
                demo: true,
                scenario: Some("TechStart Pro".to_string()),
            }
        );
    }

    #[test]
    fn bad_flags_are_errors() {
        assert!(Args::parse(args(&["--persona", "astronaut"])).is_err());
        assert!(Args::parse(args(&["--config"])).is_err());
        assert!(Args::parse(args(&["--verbose"])).is_err());
    }

    #[test]
    fn positionals_are_collected_in_order() {
        let parsed = Args::parse(args(&["seller", "Shop", "Flow"])).expect("parse");
        assert_eq!(parsed.positional, args(&["seller", "Shop", "Flow"]));
    }
}
