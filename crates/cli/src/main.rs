mod remote;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use htr_core::{
    data_dir_from_env_value, AdmissionForm, CoreConfig, Hospital, HospitalId, HospitalIdentity,
    HospitalStatus, ImageAttachment, IntakeAccumulator, MedicalHistoryForm, Nic, NonEmptyText,
    Patient, TreatmentPatch, TreatmentPlanForm, TreatmentRecord, TreatmentService,
    TreatmentStatus,
};
use remote::HttpSubmitter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "htr")]
#[command(about = "HTR hospital treatment record CLI")]
struct Cli {
    /// Data directory (overrides HTR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered patients
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// Manage hospital accounts
    Hospitals {
        #[command(subcommand)]
        command: HospitalCommands,
    },
    /// Record a treatment through the three-stage intake and submit it
    Intake(IntakeArgs),
    /// Inspect and manage treatment records
    Treatments {
        #[command(subcommand)]
        command: TreatmentCommands,
    },
    /// Show dashboard statistics for a hospital
    Stats {
        /// Hospital ID
        hospital_id: String,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List all patients
    List,
    /// Register a patient
    Add {
        /// National identity card number
        nic: String,
        /// Full name
        name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,
        #[arg(long)]
        blood_group: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show one patient
    Show {
        /// National identity card number
        nic: String,
    },
}

#[derive(Subcommand)]
enum HospitalCommands {
    /// Register a hospital (pending approval unless --status is given)
    Add {
        hospital_id: String,
        hospital_name: String,
        /// pending, approved or rejected
        #[arg(long, default_value = "pending")]
        status: HospitalStatus,
    },
    /// Change a hospital's approval status
    Status {
        hospital_id: String,
        /// pending, approved or rejected
        status: HospitalStatus,
    },
    /// List all hospitals
    List,
}

#[derive(clap::Args)]
struct IntakeArgs {
    /// Patient NIC
    nic: String,
    /// Hospital ID of the submitting (logged-in) hospital
    #[arg(long)]
    hospital: Option<String>,
    /// Hospital name, required with --server
    #[arg(long)]
    hospital_name: Option<String>,
    /// Submit to this REST server instead of the local data directory
    #[arg(long, env = "HTR_SERVER_URL")]
    server: Option<String>,

    /// Admission date (YYYY-MM-DD)
    #[arg(long)]
    admission_date: String,
    #[arg(long)]
    physician: String,
    #[arg(long)]
    diagnosis: String,

    #[arg(long, default_value = "")]
    allergies: String,
    #[arg(long, default_value = "")]
    illnesses: String,
    #[arg(long, default_value = "")]
    current_medications: String,
    #[arg(long, default_value = "")]
    surgeries: String,
    #[arg(long, default_value = "")]
    immunizations: String,
    /// Surgery image file (repeatable)
    #[arg(long = "surgery-image")]
    surgery_images: Vec<PathBuf>,

    /// Prescribed medications, comma-separated
    #[arg(long, default_value = "")]
    medications: String,
    /// Lab tests, comma-separated
    #[arg(long, default_value = "")]
    lab_tests: String,
    /// Therapies, comma-separated
    #[arg(long, default_value = "")]
    therapies: String,
    /// Lab report image file (repeatable)
    #[arg(long = "lab-image")]
    lab_images: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum TreatmentCommands {
    /// List a patient's treatments
    List {
        nic: String,
        /// Only treatments added by this hospital
        #[arg(long)]
        hospital: Option<String>,
    },
    /// Delete a treatment (by id, or the hospital's earliest for the patient)
    Delete {
        nic: String,
        treatment_id: Option<String>,
        /// Requesting hospital ID
        #[arg(long)]
        hospital: String,
    },
    /// Mark a treatment active or completed
    SetStatus {
        nic: String,
        treatment_id: String,
        /// active or completed
        status: TreatmentStatus,
        /// Requesting hospital ID
        #[arg(long)]
        hospital: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("htr_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| data_dir_from_env_value(std::env::var("HTR_DATA_DIR").ok()));

    let Some(command) = cli.command else {
        println!("Use 'htr --help' for commands");
        return Ok(());
    };

    run(command, data_dir)
}

/// Runs one command. The local data directory is only opened (and created) by commands that
/// read or write it; a remote intake never touches it.
fn run(command: Commands, data_dir: PathBuf) -> anyhow::Result<()> {
    let local = || -> anyhow::Result<TreatmentService> {
        let cfg = Arc::new(CoreConfig::new(data_dir.clone())?);
        Ok(TreatmentService::new(cfg))
    };

    match command {
        Commands::Patients { command } => run_patients(&local()?, command)?,
        Commands::Hospitals { command } => run_hospitals(&local()?, command)?,
        Commands::Intake(args) => match args.server.clone() {
            Some(server) => run_remote_intake(&server, args)?,
            None => run_local_intake(&local()?, args)?,
        },
        Commands::Treatments { command } => run_treatments(&local()?, command)?,
        Commands::Stats { hospital_id } => {
            let service = local()?;
            let stats = service.stats(&hospital_id)?;
            let counts = service.counts(&hospital_id)?;
            println!("Total patients:       {}", stats.total_patients);
            println!("Active treatments:    {}", stats.active_treatments);
            println!("Pending reports:      {}", stats.pending_reports);
            println!("Completed treatments: {}", stats.completed_treatments);
            println!("Open episodes:        {}", counts.active_treatments);
        }
    }

    Ok(())
}

fn run_patients(service: &TreatmentService, command: PatientCommands) -> anyhow::Result<()> {
    match command {
        PatientCommands::List => {
            let patients = service.patients().list();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                println!("NIC: {}, Name: {}", patient.nic, patient.name);
            }
        }
        PatientCommands::Add {
            nic,
            name,
            date_of_birth,
            blood_group,
            phone,
            email,
        } => {
            let patient = service.patients().register(Patient {
                nic: Nic::parse(&nic)?,
                name: NonEmptyText::new(name)?,
                date_of_birth,
                blood_group,
                phone,
                email,
            })?;
            println!("Registered patient {}", patient.nic);
        }
        PatientCommands::Show { nic } => {
            let patient = service.patients().find_by_nic(&Nic::parse(&nic)?)?;
            println!("{}", serde_json::to_string_pretty(&patient)?);
        }
    }
    Ok(())
}

fn run_hospitals(service: &TreatmentService, command: HospitalCommands) -> anyhow::Result<()> {
    match command {
        HospitalCommands::Add {
            hospital_id,
            hospital_name,
            status,
        } => {
            let hospital = service.hospitals().register(Hospital {
                hospital_id: HospitalId::parse(&hospital_id)?,
                hospital_name: NonEmptyText::new(hospital_name)?,
                status,
            })?;
            println!(
                "Registered hospital {} ({:?})",
                hospital.hospital_id, hospital.status
            );
        }
        HospitalCommands::Status {
            hospital_id,
            status,
        } => {
            let hospital = service
                .hospitals()
                .set_status(&HospitalId::parse(&hospital_id)?, status)?;
            println!(
                "Hospital {} is now {:?}",
                hospital.hospital_id, hospital.status
            );
        }
        HospitalCommands::List => {
            let hospitals = service.hospitals().list();
            if hospitals.is_empty() {
                println!("No hospitals found.");
            }
            for hospital in hospitals {
                println!(
                    "ID: {}, Name: {}, Status: {:?}",
                    hospital.hospital_id, hospital.hospital_name, hospital.status
                );
            }
        }
    }
    Ok(())
}

/// Runs the three intake stages from the command-line forms.
fn fill_intake(args: &IntakeArgs) -> anyhow::Result<IntakeAccumulator> {
    let mut intake = IntakeAccumulator::new(Nic::parse(&args.nic)?);

    intake.record_admission(
        AdmissionForm {
            admission_date: args.admission_date.clone(),
            admitting_physician: args.physician.clone(),
            primary_diagnosis: args.diagnosis.clone(),
        },
        Local::now().date_naive(),
    )?;
    intake.record_medical_history(MedicalHistoryForm {
        allergies: args.allergies.clone(),
        illnesses: args.illnesses.clone(),
        medications: args.current_medications.clone(),
        surgeries: args.surgeries.clone(),
        immunizations: args.immunizations.clone(),
        surgery_images: attachments(&args.surgery_images)?,
    })?;
    intake.record_treatment_plan(TreatmentPlanForm {
        medications: args.medications.clone(),
        lab_tests: args.lab_tests.clone(),
        therapies: args.therapies.clone(),
        lab_images: attachments(&args.lab_images)?,
    })?;

    Ok(intake)
}

fn run_local_intake(service: &TreatmentService, args: IntakeArgs) -> anyhow::Result<()> {
    let mut intake = fill_intake(&args)?;
    let session = match args.hospital {
        Some(id) => Some(service.requester(&id)?),
        None => None,
    };
    let record = intake.commit(session.as_ref(), service)?;

    println!("Treatment added successfully");
    print_record(&record);
    Ok(())
}

fn run_remote_intake(server: &str, args: IntakeArgs) -> anyhow::Result<()> {
    let mut intake = fill_intake(&args)?;
    let session = remote_session(args.hospital, args.hospital_name)?;
    let submitter = HttpSubmitter::new(server)?;
    let record = intake.commit(session.as_ref(), &submitter)?;

    println!("Treatment added successfully");
    print_record(&record);
    Ok(())
}

fn remote_session(
    hospital_id: Option<String>,
    hospital_name: Option<String>,
) -> anyhow::Result<Option<HospitalIdentity>> {
    let Some(hospital_id) = hospital_id else {
        return Ok(None);
    };
    let hospital_name = hospital_name.context("--hospital-name is required with --server")?;
    Ok(Some(HospitalIdentity {
        hospital_id: HospitalId::parse(&hospital_id)?,
        hospital_name: NonEmptyText::new(hospital_name)?,
    }))
}

fn attachments(paths: &[PathBuf]) -> anyhow::Result<Vec<ImageAttachment>> {
    paths
        .iter()
        .map(|path| {
            ImageAttachment::from_path(path)
                .with_context(|| format!("reading image {}", path.display()))
        })
        .collect()
}

fn run_treatments(service: &TreatmentService, command: TreatmentCommands) -> anyhow::Result<()> {
    match command {
        TreatmentCommands::List { nic, hospital } => {
            for record in service.list_by_patient(&nic, hospital.as_deref())? {
                print_record(&record);
            }
        }
        TreatmentCommands::Delete {
            nic,
            treatment_id,
            hospital,
        } => {
            let removed = match treatment_id {
                Some(id) => service.delete_by_id(&nic, &id, &hospital)?,
                None => service.delete_by_nic(&nic, &hospital)?,
            };
            println!("Treatment deleted successfully ({})", removed);
        }
        TreatmentCommands::SetStatus {
            nic,
            treatment_id,
            status,
            hospital,
        } => {
            let patch = TreatmentPatch {
                status: Some(status),
                ..Default::default()
            };
            let record = service.update(&nic, &treatment_id, &hospital, patch)?;
            println!("Treatment updated successfully");
            print_record(&record);
        }
    }
    Ok(())
}

fn print_record(record: &TreatmentRecord) {
    println!(
        "ID: {}, Patient: {}, Hospital: {} ({}), Admitted: {}, Status: {:?}",
        record.id,
        record.patient_nic,
        record.hospital_name,
        record.hospital_id,
        record.admission.date,
        record.status
    );
    println!(
        "  Diagnosis: {}; Medications: {}; Lab images: {}",
        record.admission.primary_diagnosis.join(", "),
        record.treatment_plan.medications.join(", "),
        record.treatment_plan.lab_images.len()
    );
}
