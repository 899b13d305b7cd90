use std::fs::File;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use dar_digest::DigestEngine;
use dar_gateway::{ConfirmationMode, Gateway, GatewayConfig, InMemoryLedger};
use dar_registry::{
    Address, AssetId, DeleteOutcome, Registry, RegistryConfig, RegistryError, UpdateHashOutcome,
};
use dar_session::{IdentityProvider, SessionManager, StaticProvider};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Digest(args) => cmd_digest(args, &cli.format),
        Command::Demo(args) => cmd_demo(args, &cli.format).await,
    }
}

fn cmd_digest(args: DigestArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let mut file =
        File::open(&args.path).with_context(|| format!("cannot open {}", args.path))?;
    let digest = DigestEngine::ASSET
        .digest_reader(&mut file)
        .with_context(|| format!("cannot read {}", args.path))?;

    match format {
        OutputFormat::Text => {
            println!("{}  {}", digest.to_hex().cyan(), args.path.bold());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                json!({ "path": args.path, "digest": digest.to_hex() })
            );
        }
    }
    Ok(())
}

async fn cmd_demo(args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let alice = Address::from_raw([0x11; 20]);
    let bob = Address::from_raw([0x22; 20]);

    let ledger = Arc::new(InMemoryLedger::new(ConfirmationMode::Delayed(
        Duration::from_millis(args.latency_ms),
    )));
    let provider = Arc::new(StaticProvider::new(vec![alice, bob]));
    let session = Arc::new(
        SessionManager::connect(provider.clone() as Arc<dyn IdentityProvider>).await?,
    );
    let gateway = Gateway::new(ledger.clone(), GatewayConfig::default());
    let registry = Registry::new(
        gateway,
        session,
        RegistryConfig {
            confirmation_timeout: Duration::from_millis(args.timeout_ms),
        },
    );

    let mut steps = Vec::new();
    let text = matches!(format, OutputFormat::Text);

    if text {
        println!("Connected as {}", alice.to_hex().cyan());
    }

    // Register a content-addressed asset.
    let content: &[u8] = b"DEED OF SALE -- one parcel of land, lot 42";
    let outcome = registry
        .register_source("deed", "land title", &mut Cursor::new(content))
        .await?;
    let id = outcome.id;
    if text {
        println!(
            "{} Registered asset {} (tx {})",
            "✓".green().bold(),
            id.to_string().yellow(),
            outcome.tx.short_hex().dimmed()
        );
        println!("  Digest: {}", outcome.asset.hash.to_hex().cyan());
    }
    steps.push(json!({ "step": "register", "id": id, "tx": outcome.tx.to_hex() }));

    // Read the confirmed record back.
    let asset = registry.get(id).await?;
    if text {
        println!(
            "  {} — {} (owner {}, active {})",
            asset.name.bold(),
            asset.description,
            asset.owner.short_id().cyan(),
            asset.is_active
        );
    }
    steps.push(json!({ "step": "get", "asset": asset.clone() }));

    // Integrity verification: pristine and tampered bytes.
    let intact = registry
        .verify_source(id, &mut Cursor::new(content))
        .await?;
    let tampered = registry
        .verify_source(id, &mut Cursor::new(b"DEED OF SALE -- lot 43"))
        .await?;
    if text {
        println!(
            "{} Integrity: original {}, tampered {}",
            "✓".green().bold(),
            ok_str(intact),
            ok_str(!tampered)
        );
    }
    steps.push(json!({ "step": "verify", "intact": intact, "tampered": tampered }));

    // Re-submitting the same hash short-circuits locally.
    let unchanged = registry.update_hash(id, asset.hash, false).await?;
    if text && matches!(unchanged, UpdateHashOutcome::Unchanged { .. }) {
        println!("{} Unchanged hash skipped submission", "✓".green().bold());
    }
    steps.push(json!({ "step": "update_hash_noop", "outcome": unchanged }));

    // Transfer ownership to Bob.
    let transfer = registry.transfer(id, bob).await?;
    if text {
        println!(
            "{} Transferred to {} (tx {})",
            "✓".green().bold(),
            bob.short_id().cyan(),
            transfer.tx.short_hex().dimmed()
        );
    }
    steps.push(json!({ "step": "transfer", "new_owner": bob.to_hex() }));

    // Alice no longer owns the asset; the delete is refused.
    match registry.delete(id).await {
        Err(RegistryError::Revert(reason)) => {
            if text {
                println!("{} Delete as Alice refused: {}", "✗".red().bold(), reason);
            }
            steps.push(json!({ "step": "delete_refused", "reason": reason }));
        }
        other => anyhow::bail!("expected a revert, got {other:?}"),
    }

    // Switch the acting identity to Bob and delete for real.
    let mut watcher = registry.session().watch();
    provider.switch_account(bob);
    watcher
        .wait_for(|account| *account == Some(bob))
        .await
        .context("session never observed the account change")?;
    if text {
        println!("Switched account to {}", bob.to_hex().cyan());
    }

    let deleted = registry.delete(id).await?;
    if let DeleteOutcome::Deleted { tx, .. } = &deleted {
        if text {
            println!(
                "{} Deleted asset {} (tx {})",
                "✓".green().bold(),
                id.to_string().yellow(),
                tx.short_hex().dimmed()
            );
        }
    }
    steps.push(json!({ "step": "delete", "outcome": deleted }));

    let final_state = registry.get(id).await?;
    let owned: Vec<AssetId> = registry.list_owned(bob).await?;
    if text {
        println!(
            "Final state: active {}, Bob owns {:?}",
            final_state.is_active,
            owned.iter().map(|i| i.value()).collect::<Vec<_>>()
        );
    }
    steps.push(json!({ "step": "final", "asset": final_state, "owned_by_bob": owned }));

    if !text {
        println!("{}", serde_json::to_string_pretty(&json!({ "steps": steps }))?);
    }
    Ok(())
}

fn ok_str(ok: bool) -> colored::ColoredString {
    if ok {
        "ok".green()
    } else {
        "FAILED".red()
    }
}
