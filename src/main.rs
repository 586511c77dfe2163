use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use triage_kiosk::adapters::capture::face_signal;
use triage_kiosk::adapters::{HttpReasoningService, SignalFaceSensor, SqliteStore, WavFileRecorder};
use triage_kiosk::domain::{DoctorUpdate, NewDoctor, Page, TriageFilter};
use triage_kiosk::kiosk::{Kiosk, PresenceExit};
use triage_kiosk::ports::{DoctorRepository, PatientRepository, TriageRepository};
use triage_kiosk::{AppConfig, DispatchOutcome, DispatchPipeline};

/// How often a supervised session samples the face signal
const PRESENCE_POLL: Duration = Duration::from_millis(500);

/// Application state shared by the operator console
struct AppState {
    store: Arc<SqliteStore>,
    pipeline: Arc<DispatchPipeline>,
    kiosk: Arc<Kiosk>,
    recorder: WavFileRecorder,
    face: watch::Sender<bool>,
}

/// Initialize the application
///
/// Sets up database connection, runs migrations and wires the dispatch pipeline and the
/// kiosk driver.
fn initialize_app(config: &AppConfig) -> anyhow::Result<AppState> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let store = Arc::new(SqliteStore::new(&config.db_path)?);
    store.run_migrations()?;

    let reasoning = HttpReasoningService::new(config.require_endpoint()?, config.request_timeout)?;
    log::info!("Reasoning service endpoint: {}", reasoning.endpoint());

    let manager = Arc::new(triage_kiosk::TriageManager::new(&config.data_dir));
    let pipeline = Arc::new(DispatchPipeline::new(
        manager,
        Arc::new(reasoning),
        store.clone(),
        store.clone(),
    ));

    let recorder = WavFileRecorder::new();
    let kiosk = Arc::new(Kiosk::new(
        Arc::clone(&pipeline),
        Box::new(recorder.clone()),
        config.face_timeout,
    ));
    let (face, _) = face_signal(true);
    log::info!("Face absence timeout: {:?}", config.face_timeout);

    Ok(AppState {
        store,
        pipeline,
        kiosk,
        recorder,
        face,
    })
}

const HELP: &str = "commands:
  new                                   open a new triage session
  sessions                              list open sessions
  attach <session> <wav>                record a WAV file into a session
  dispatch <session> [doctor]           send the session's audio to the reasoning service
  recover <session> [doctor]            retry saving a finished session from its snapshot
  finish <session>                      abandon a session (artifacts stay on disk)
  face <on|off>                         report whether a face is in front of the kiosk
  doctors                               list doctors
  add-doctor [--crm <crm>] <cpf> <name...>
                                        register a doctor
  update-doctor <id> <name|cpf|crm> <value...>
                                        change a doctor; crm '-' clears the license
  delete-doctor <id>                    remove a doctor; their triages become unassigned
  patients                              list patients
  triages [patient]                     list triage records
  quit";

const ADD_DOCTOR_USAGE: &str = "usage: add-doctor [--crm <crm>] <cpf> <name...>";
const UPDATE_DOCTOR_USAGE: &str = "usage: update-doctor <id> <name|cpf|crm> <value...>";

fn parse_id(arg: &str, what: &str) -> anyhow::Result<i64> {
    arg.parse::<i64>()
        .with_context(|| format!("invalid {} id '{}'", what, arg))
}

fn parse_doctor(arg: Option<&str>) -> anyhow::Result<Option<i64>> {
    arg.map(|s| parse_id(s, "doctor")).transpose()
}

fn parse_new_doctor(args: &[&str]) -> anyhow::Result<NewDoctor> {
    let mut args = args.to_vec();
    let crm = match args.iter().position(|a| *a == "--crm") {
        Some(i) => {
            anyhow::ensure!(i + 1 < args.len(), ADD_DOCTOR_USAGE);
            let crm = args[i + 1].to_string();
            args.drain(i..=i + 1);
            Some(crm)
        }
        None => None,
    };

    let (cpf, name) = args.split_first().context(ADD_DOCTOR_USAGE)?;
    let name = name.join(" ");
    anyhow::ensure!(!name.is_empty(), ADD_DOCTOR_USAGE);

    let doctor = NewDoctor::new(name, *cpf);
    Ok(match crm {
        Some(crm) => doctor.with_crm(crm),
        None => doctor,
    })
}

fn parse_doctor_update(args: &[&str]) -> anyhow::Result<(i64, DoctorUpdate)> {
    let [id, field, value @ ..] = args else {
        anyhow::bail!(UPDATE_DOCTOR_USAGE);
    };
    let id = parse_id(id, "doctor")?;
    let value = value.join(" ");
    anyhow::ensure!(!value.is_empty(), UPDATE_DOCTOR_USAGE);

    let mut update = DoctorUpdate::default();
    match *field {
        "name" => update.name = Some(value),
        "cpf" => update.cpf = Some(value),
        "crm" if value == "-" => update.crm = Some(None),
        "crm" => update.crm = Some(Some(value)),
        _ => anyhow::bail!(UPDATE_DOCTOR_USAGE),
    }
    Ok((id, update))
}

fn report(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Finished {
            session_id,
            patient_id,
            triage_id,
            document_path,
            message,
        } => {
            println!("AI: {}", message.unwrap_or_default());
            println!(
                "session {} finished: patient {}, triage {}, document {}",
                session_id,
                patient_id,
                triage_id,
                document_path.display()
            );
        }
        DispatchOutcome::FollowUp { session_id, message } => {
            println!("AI: {}", message.unwrap_or_default());
            println!("session {} needs another recording", session_id);
        }
    }
}

/// Watch the face signal for a session until it finishes or is abandoned
fn supervise(state: &AppState, session_id: String) {
    let kiosk = Arc::clone(&state.kiosk);
    let mut sensor = SignalFaceSensor::new(state.face.subscribe());
    tokio::spawn(async move {
        match kiosk
            .supervise_presence(&mut sensor, &session_id, PRESENCE_POLL)
            .await
        {
            Ok(PresenceExit::Abandoned) => {
                println!("session {} abandoned: no face in view", session_id)
            }
            Ok(PresenceExit::SessionClosed) => {}
            Err(e) => log::warn!("Presence supervision of {} stopped: {}", session_id, e),
        }
    });
}

async fn handle(state: &AppState, line: &str) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    let args: Vec<&str> = parts.collect();

    match command {
        "new" => {
            let session = state.kiosk.new_encounter()?;
            println!("session {} created at {}", session.id(), session.path().display());
            supervise(state, session.id().to_string());
        }
        "sessions" => {
            for (id, meta) in state.kiosk.manager().list_sessions() {
                println!("{}  {}", id, meta.state);
            }
        }
        "attach" => {
            let [id, wav] = args.as_slice() else {
                anyhow::bail!("usage: attach <session> <wav>");
            };
            state.recorder.load(*wav);
            state.kiosk.start_recording(id).await?;
            let path = state.kiosk.stop_recording(id).await?;
            println!("audio recorded to {}", path.display());
        }
        "dispatch" => {
            let id = args.first().context("usage: dispatch <session> [doctor]")?;
            let doctor = parse_doctor(args.get(1).copied())?;
            let pipeline = Arc::clone(&state.pipeline);
            let id = id.to_string();
            // The remote call runs on its own task so the console stays responsive
            tokio::spawn(async move {
                match pipeline.dispatch(&id, doctor).await {
                    Ok(outcome) => report(outcome),
                    Err(e) => println!("dispatch of {} failed: {}", id, e),
                }
            });
        }
        "recover" => {
            let id = args.first().context("usage: recover <session> [doctor]")?;
            let doctor = parse_doctor(args.get(1).copied())?;
            report(state.pipeline.recover(id, doctor).await?);
        }
        "finish" => {
            let id = args.first().context("usage: finish <session>")?;
            if state.kiosk.manager().finish_session(id) {
                println!("session {} closed", id);
            } else {
                println!("no open session {}", id);
            }
        }
        "face" => {
            let present = match args.first().copied() {
                Some("on") => true,
                Some("off") => false,
                _ => anyhow::bail!("usage: face <on|off>"),
            };
            state.face.send_replace(present);
        }
        "doctors" => {
            for d in state.store.list_doctors(Page::default()).await? {
                println!("{}  {} ({})", d.id, d.name, d.crm.unwrap_or_default());
            }
        }
        "add-doctor" => {
            let id = state.store.create_doctor(&parse_new_doctor(&args)?).await?;
            println!("doctor {} registered", id);
        }
        "update-doctor" => {
            let (id, update) = parse_doctor_update(&args)?;
            if state.store.update_doctor(id, &update).await? {
                println!("doctor {} updated", id);
            } else {
                println!("no doctor {}", id);
            }
        }
        "delete-doctor" => {
            let id = parse_id(args.first().context("usage: delete-doctor <id>")?, "doctor")?;
            if state.store.delete_doctor(id).await? {
                println!("doctor {} removed", id);
            } else {
                println!("no doctor {}", id);
            }
        }
        "patients" => {
            for p in state.store.list_patients(Page::default()).await? {
                println!("{}  {} ({})", p.id, p.name, p.cpf);
            }
        }
        "triages" => {
            let filter = match args.first() {
                Some(p) => TriageFilter::by_patient(parse_id(p, "patient")?),
                None => TriageFilter::default(),
            };
            for t in state.store.list_triages(Page::default(), filter).await? {
                println!(
                    "{}  session {}  patient {}  doctor {}",
                    t.id,
                    t.code,
                    t.patient_id,
                    t.main_doctor_id
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        "quit" | "exit" => return Ok(false),
        _ => println!("{}", HELP),
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let state = initialize_app(&config)?;
    log::info!(
        "Triage kiosk ready (database {}, data {})",
        config.db_path.display(),
        config.data_dir.display()
    );
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle(&state, line.trim()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error: {:#}", e),
        }
    }

    Ok(())
}
