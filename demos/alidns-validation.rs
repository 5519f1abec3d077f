// # Alidns Real Environment Validation Tool
//
// Drives the alidns adapter against the real Aliyun DNS API in a controlled
// environment.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// EDGESYNC_MODE=dry-run \
// EDGESYNC_ACCESS_KEY=your_key \
// EDGESYNC_ACCESS_SECRET=your_secret \
// EDGESYNC_RECORD_NAME=edgesync-test.example.com \
// EDGESYNC_RECORD_TYPE=A \
// EDGESYNC_TEST_VALUE=1.2.3.4 \
// cargo run --bin alidns_validation
//
// # Live mode (makes actual changes!)
// EDGESYNC_MODE=live \
// EDGESYNC_ACCESS_KEY=your_key \
// EDGESYNC_ACCESS_SECRET=your_secret \
// EDGESYNC_RECORD_NAME=edgesync-test.example.com \
// EDGESYNC_RECORD_TYPE=A \
// EDGESYNC_TEST_VALUE=1.2.3.4 \
// cargo run --bin alidns_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `EDGESYNC_ACCESS_KEY`: Aliyun access key id
// - `EDGESYNC_ACCESS_SECRET`: Aliyun access key secret
// - `EDGESYNC_RECORD_NAME`: Full record name (e.g., "edgesync-test.example.com")
// - `EDGESYNC_TEST_VALUE`: Record value to push
//
// Optional:
// - `EDGESYNC_RECORD_TYPE`: Record type (A, AAAA, CNAME or TXT, default: A)
// - `EDGESYNC_TTL`: TTL text (e.g., "600", "10m", default: provider default)
// - `EDGESYNC_MODE`: "dry-run" or "live" (default: dry-run)

use edgesync_core::config::{DnsService, RecordType};
use edgesync_core::traits::{DnsAdapter, DnsAdapterFactory};
use edgesync_core::{domain, ConvergeAction, SourceKind, SourceTarget};
use edgesync_provider_aliyun::AlidnsFactory;
use std::env;
use std::net::{Ipv4Addr, Ipv6Addr};

fn required(var: &str) -> String {
    env::var(var).unwrap_or_else(|_| {
        tracing::error!("{} environment variable is required", var);
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("=== Alidns Adapter Real Environment Validation ===");

    // Read environment variables
    let access_key = required("EDGESYNC_ACCESS_KEY");
    let access_secret = required("EDGESYNC_ACCESS_SECRET");
    let record_name = required("EDGESYNC_RECORD_NAME");
    let test_value = required("EDGESYNC_TEST_VALUE");
    let record_type_text = env::var("EDGESYNC_RECORD_TYPE").unwrap_or_else(|_| "A".to_string());
    let ttl = env::var("EDGESYNC_TTL").ok();

    let mode = env::var("EDGESYNC_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = mode.to_lowercase() == "dry-run";

    if dry_run {
        tracing::warn!("Running in DRY-RUN mode - no remote calls will be made");
    } else {
        tracing::warn!("Running in LIVE mode - will make actual DNS changes!");
    }

    let record_type = match record_type_text.as_str() {
        "A" => RecordType::A,
        "AAAA" => RecordType::Aaaa,
        "CNAME" => RecordType::Cname,
        "TXT" => RecordType::Txt,
        other => {
            tracing::error!("Unsupported record type: {}", other);
            std::process::exit(1);
        }
    };

    // Validate the value against the record type
    match record_type {
        RecordType::A if test_value.parse::<Ipv4Addr>().is_err() => {
            tracing::error!("Record type A requires an IPv4 address");
            std::process::exit(1);
        }
        RecordType::Aaaa if test_value.parse::<Ipv6Addr>().is_err() => {
            tracing::error!("Record type AAAA requires an IPv6 address");
            std::process::exit(1);
        }
        _ => {}
    }

    let target_kind = match record_type {
        RecordType::A => SourceKind::Ipv4,
        RecordType::Aaaa => SourceKind::Ipv6,
        _ => SourceKind::Domain,
    };

    let service = DnsService {
        id: "validation".to_string(),
        name: "alidns validation".to_string(),
        domain: record_name.clone(),
        provider: "alidns".to_string(),
        access_key,
        access_secret,
        record_type,
        ttl,
        target: SourceTarget::new(target_kind, test_value.clone()),
    };

    tracing::info!("Configuration:");
    tracing::info!("  Record: {}", record_name);
    tracing::info!("  Root domain: {}", domain::root_domain(&record_name));
    tracing::info!("  Host record: {}", domain::host_record(&record_name));
    tracing::info!("  Type: {}", record_type.as_str());
    tracing::info!("  Value: {}", test_value);
    tracing::info!("  TTL: {}s", service.ttl_seconds());
    tracing::info!("  Mode: {}", mode);

    // Test 1: Create the adapter through its factory
    tracing::info!("\n--- Step 1: Creating Alidns Adapter ---");
    let adapter = AlidnsFactory.create()?;
    tracing::info!("Adapter created successfully (credentials not shown)");

    // Test 2: Validate the service descriptor
    tracing::info!("\n--- Step 2: Validating Service Descriptor ---");
    match adapter.validate(&service) {
        Ok(()) => tracing::info!("✓ Service descriptor is valid"),
        Err(e) => {
            tracing::error!("✗ Validation failed: {}", e);
            std::process::exit(1);
        }
    }

    if dry_run {
        tracing::info!("\n=== DRY-RUN COMPLETE ===");
        tracing::info!("No remote calls were made.");
        tracing::info!("To push the record, set EDGESYNC_MODE=live");
        return Ok(());
    }

    // Test 3: Converge (describe, then add or update)
    tracing::info!("\n--- Step 3: Converging DNS Record ---");
    match adapter.converge(&service, &test_value).await {
        Ok(outcome) => {
            tracing::info!("✓ Convergence succeeded");
            match outcome.action {
                ConvergeAction::Created => tracing::info!("  Result: record created"),
                ConvergeAction::Modified => tracing::info!("  Result: record updated in place"),
            }
        }
        Err(e) => {
            tracing::error!("✗ Convergence failed: {}", e);
            std::process::exit(1);
        }
    }

    // Test 4: Re-converge against the now-existing record
    tracing::info!("\n--- Step 4: Re-Converging (record now exists) ---");
    match adapter.converge(&service, &test_value).await {
        Ok(outcome) if outcome.action == ConvergeAction::Modified => {
            tracing::info!("✓ Re-convergence addressed the existing record");
        }
        Ok(_) => {
            tracing::warn!("⚠ Re-convergence created a second record (unexpected)");
        }
        Err(e) => {
            tracing::error!("✗ Re-convergence failed: {}", e);
            std::process::exit(1);
        }
    }

    // Summary
    tracing::info!("\n=== Validation Summary ===");
    tracing::info!("✓ Adapter creation: OK");
    tracing::info!("✓ Service validation: OK");
    tracing::info!("✓ Record convergence: OK");
    tracing::info!("✓ Re-convergence: OK");
    tracing::info!("✓ Security: credentials not logged");
    tracing::info!("\n=== LIVE MODE COMPLETE ===");
    tracing::info!("Verify at: https://dnschecker.org/#{}/{}", record_type.as_str(), record_name);

    Ok(())
}
