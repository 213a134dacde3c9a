//! Walk through the agenda: patients, appointments, triage and notes.
//!
//! Run with `RUST_LOG=debug` to see what each structure does.

use clinic_agenda::{Agenda, ClinicalNotes, Config, PatientDetails, Result, Severity};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::default().with_snapshot_path(path),
        None => Config::default(),
    };
    let agenda = Agenda::open(config)?;

    example_patients(&agenda)?;
    example_appointments(&agenda)?;
    example_triage(&agenda)?;
    example_notes(&agenda)?;

    println!("=== Dashboard ===\n");
    println!("{}", serde_json::to_string_pretty(&agenda.dashboard())?);
    Ok(())
}

fn example_patients(agenda: &Agenda) -> Result<()> {
    println!("=== Patients (hash table) ===\n");

    for (cpf, name) in [
        ("529.982.247-25", "Ana Souza"),
        ("111.444.777-35", "Bruno Lima"),
        ("123.456.789-09", "Carla Dias"),
    ] {
        let reg = agenda.register_patient(cpf, PatientDetails::new(name))?;
        println!(
            "{} -> bucket {} ({:?}, {} collisions)",
            reg.patient.cpf, reg.outcome.bucket, reg.outcome.kind, reg.outcome.collisions_in_bucket
        );
    }

    match agenda.register_patient("111.111.111-11", PatientDetails::new("Nobody")) {
        Err(e) => println!("rejected: {e}"),
        Ok(_) => unreachable!("repeated digits are never a valid CPF"),
    }

    let stats = agenda.patient_stats();
    println!("load factor: {:.4}, capacity: {}\n", stats.load_factor, stats.capacity);
    Ok(())
}

fn example_appointments(agenda: &Agenda) -> Result<()> {
    println!("=== Appointments (AVL tree) ===\n");

    for (cpf, when) in [
        ("529.982.247-25", "2024-03-01 10:00"),
        ("111.444.777-35", "2024-03-01 09:00"),
        ("123.456.789-09", "2024-03-01 11:00"),
        ("529.982.247-25", "2024-03-02 08:30"),
    ] {
        let booking = agenda.schedule(cpf, when, "Dr. Reis", "")?;
        println!(
            "{} -> height {}, {} rotations",
            booking.appointment.when, booking.height, booking.rotations
        );
    }

    println!();
    for line in agenda.report().index_outline {
        println!("{line}");
    }
    println!();
    Ok(())
}

fn example_triage(agenda: &Agenda) -> Result<()> {
    println!("=== Triage (min-heap) ===\n");

    agenda.admit("529.982.247-25", Severity::Normal, "routine check")?;
    agenda.admit("111.444.777-35", Severity::Emergency, "chest pain")?;
    let admission = agenda.admit("123.456.789-09", Severity::Urgent, "high fever")?;
    println!("Carla is number {} in line", admission.position);

    while let Ok(next) = agenda.call_next() {
        println!("calling {} ({:?}): {}", next.patient_name, next.severity, next.description);
    }
    println!();
    Ok(())
}

fn example_notes(agenda: &Agenda) -> Result<()> {
    println!("=== Clinical notes (Huffman) ===\n");

    let notes = ClinicalNotes {
        symptoms: Some("headache for three days, light sensitivity".into()),
        diagnosis: Some("migraine".into()),
        prescription: Some("rest, hydration, follow-up in 15 days".into()),
        ..ClinicalNotes::default()
    };
    let packed = agenda.compress_notes("529.982.247-25", &notes)?;
    let stats = &packed.compressed.stats;
    println!(
        "{} bits -> {} bits ({:.1}% saved, efficiency {:.1}%)",
        stats.original_bits, stats.encoded_bits, stats.percent_saved, stats.efficiency
    );

    let restored = agenda.decompress_notes(&packed.compressed.bits, &packed.compressed.tree)?;
    println!("restored diagnosis: {:?}\n", restored.diagnosis);
    Ok(())
}
