//! Module: Main
//! But: Terminal front-end for the CharX wallet generator.
//!
//! *Signed: kryon.kas*

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use charx_wallet::{
    Bip44Derivation, COPY_FEEDBACK_WINDOW, DEFAULT_DERIVATION_PATH, DirectoryExport, Field, Pacing,
    Stage, SystemClipboard, WalletGenerator,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

// --- Configuration ---

/// CharX Wallet Generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// BIP32 derivation path for the key pair.
    #[arg(short, long, default_value = DEFAULT_DERIVATION_PATH)]
    path: String,

    /// Skip the pauses between generation steps.
    #[arg(long, default_value_t = false)]
    no_pacing: bool,

    /// Show the private key instead of bullets.
    #[arg(short, long, default_value_t = false)]
    reveal: bool,

    /// Copy a field after generation: seed, public or private.
    #[arg(short, long)]
    copy: Option<Field>,

    /// Directory for JSON backups.
    /// Défaut: current directory. With --once a backup is written right away.
    #[arg(short, long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Exit after the first wallet instead of opening the prompt.
    #[arg(long, default_value_t = false)]
    once: bool,
}

// --- Affichage ---

fn print_notice() {
    println!("CharX Wallet");
    println!();
    println!("[SECURITY NOTICE]");
    println!("Never share your private key or seed phrase with anyone.");
    println!("Store them securely offline. Keys are generated locally.");
    println!();
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  s           show the wallet");
    println!("  r           reveal / hide the private key");
    println!("  c <field>   copy seed, public or private");
    println!("  d           download a JSON backup");
    println!("  n           create a new wallet");
    println!("  i           import an existing 12-word phrase");
    println!("  x           clear the wallet");
    println!("  q           quit");
}

/// Prints the labels of the steps after `shown`, up to `reached`.
fn print_progress(shown: Stage, reached: Stage) -> Stage {
    for step in Stage::STEPS {
        if step > shown && step <= reached {
            if let Some(label) = step.label() {
                println!("  [x] {label}");
            }
        }
    }
    shown.max(reached)
}

fn copied_tag(generator: &WalletGenerator, field: Field) -> &'static str {
    if generator.is_copied(field) { "  [copied]" } else { "" }
}

fn render(generator: &WalletGenerator) {
    let Some(record) = generator.record() else {
        println!("No wallet yet. Use 'n' to create one.");
        return;
    };

    println!();
    println!("[WALLET CREATED]");
    println!("Derivation path: {}", generator.derivation_path());

    println!();
    println!("Seed Phrase (BIP39){}", copied_tag(generator, Field::Seed));
    let words: Vec<&str> = record.words().collect();
    for (row, chunk) in words.chunks(3).enumerate() {
        let line: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(col, word)| format!("{:>2}. {word:<10}", row * 3 + col + 1))
            .collect();
        println!("  {}", line.join(" "));
    }
    println!("  Write down these 12 words in order and store them safely offline.");

    println!();
    println!("Public Key{}", copied_tag(generator, Field::Public));
    println!("  {}", record.public_key());
    println!("  Safe to share - used to receive funds.");

    println!();
    println!("Private Key{}", copied_tag(generator, Field::Private));
    println!("  {}", generator.private_key_display().unwrap_or_default());
    println!("  NEVER share this - it gives full access to your wallet.");
}

// --- Actions ---

async fn create_wallet(generator: &WalletGenerator) -> charx_wallet::Result<()> {
    println!("Generating wallet...");

    let mut stages = generator.subscribe();
    let mut shown = Stage::Idle;
    let generation = generator.generate();
    tokio::pin!(generation);

    let result = loop {
        tokio::select! {
            result = &mut generation => break result,
            Ok(()) = stages.changed() => {
                shown = print_progress(shown, *stages.borrow_and_update());
            }
        }
    };

    // Steps finished without a pause are printed here.
    if result.is_ok() {
        print_progress(shown, generator.stage());
    }
    result.map(|_| ())
}

fn copy(generator: &WalletGenerator, field: Field) {
    match generator.copy_field(field) {
        Ok(()) => println!(
            "Copied {field} to the clipboard. ({}s)",
            COPY_FEEDBACK_WINDOW.as_secs()
        ),
        Err(e) => eprintln!("Copy failed: {e}"),
    }
}

fn export(generator: &WalletGenerator) {
    match generator.export_record() {
        Ok(path) => println!("Backup saved to {}", path.display()),
        Err(e) => eprintln!("Backup failed: {e}"),
    }
}

// --- Boucle Interactive ---

async fn interactive(generator: &WalletGenerator) -> anyhow::Result<()> {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        let mut parts = line.split_whitespace();

        match parts.next() {
            None => continue,
            Some("s") => render(generator),
            Some("r") => {
                generator.toggle_reveal();
                println!("  {}", generator.private_key_display().unwrap_or_default());
            }
            Some("c") => match parts.next().map(str::parse::<Field>) {
                Some(Ok(field)) => copy(generator, field),
                Some(Err(e)) => eprintln!("{e}"),
                None => eprintln!("Usage: c <seed|public|private>"),
            },
            Some("d") => export(generator),
            Some("n") => match create_wallet(generator).await {
                Ok(()) => render(generator),
                Err(e) => eprintln!("Error: {e}"),
            },
            Some("i") => {
                println!("Enter the 12-word phrase:");
                let Some(phrase) = lines.next_line().await? else { break };
                let phrase = Zeroizing::new(phrase);
                match generator.restore(&phrase) {
                    Ok(_) => render(generator),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Some("x") => {
                generator.reset();
                println!("Wallet cleared.");
            }
            Some("q") => break,
            Some("h") => print_help(),
            Some(other) => eprintln!("Unknown command '{other}' (h for help)"),
        }
    }

    generator.reset();
    Ok(())
}

// --- Exécution ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "charx_wallet=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let derivation = Bip44Derivation::new().with_path(&args.path)?;
    let pacing = if args.no_pacing { Pacing::none() } else { Pacing::default() };
    let export_dir = args.export.clone().unwrap_or_else(|| PathBuf::from("."));

    // The process exits right after a one-shot copy, so the clipboard must
    // be held until another application takes it over.
    let clipboard = if args.once && args.copy.is_some() {
        SystemClipboard::holding()
    } else {
        SystemClipboard::new()
    };
    let holding = clipboard.holds_until_replaced();

    let generator =
        WalletGenerator::new(derivation, clipboard, DirectoryExport::new(export_dir))
            .with_pacing(pacing);

    print_notice();
    create_wallet(&generator)
        .await
        .context("wallet generation failed")?;

    if args.reveal {
        generator.toggle_reveal();
    }
    render(&generator);

    if args.once && args.export.is_some() {
        export(&generator);
    }

    if let Some(field) = args.copy {
        if holding && cfg!(target_os = "linux") {
            println!("Serving {field} on the clipboard until another copy replaces it (Ctrl-C to stop)...");
        }
        copy(&generator, field);
    }

    if args.once {
        generator.reset();
        return Ok(());
    }

    interactive(&generator).await
}
