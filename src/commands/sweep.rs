use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use secrecy::ExposeSecret;
use std::fs;
use std::path::Path;
use teardown::{
    AuthMode, CancelToken, CategoryKind, CredentialsInput, Executor, ManagementClient, OrgContext,
    Reporter, RunReport, TeardownOptions, UreqTransport, authenticate,
};

use crate::Context;
use crate::cli::SweepArgs;
use crate::config::Config;
use crate::sink::TerminalSink;
use crate::{prompt, signal, ui};

pub fn run(ctx: &Context, args: SweepArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let mode = args.auth.map_or(config.auth.mode, AuthMode::from);

    let organization = prompt::value_or_prompt(args.org, "Organization")?;
    let username = prompt::value_or_prompt(args.username, "Username")?;
    let password = prompt::secret_or_prompt(args.password, "Password")?;
    let input = CredentialsInput {
        organization: organization.clone(),
        username,
        password,
        mfa_code: args.mfa_code,
    };

    let options = TeardownOptions {
        dry_run: args.dry_run,
        only: args.only,
        retry: config.retry.policy(),
        extension_environments: config.extensions.environments.clone(),
        extra_exclusions: config.exclusion_map()?,
    };

    ui::header(&format!("Sweeping organization {organization}"));
    ui::kv("Management API", &config.endpoints.management);
    if ctx.verbose > 0 {
        ui::kv("Token endpoint", &config.endpoints.token);
        ui::kv("Portal API", &config.endpoints.portal_api);
    }
    ui::kv("Auth", &mode.to_string());
    ui::kv("Categories", &selection_label(&options.only));
    if options.dry_run {
        ui::kv("Mode", "dry run");
    }

    if !args.yes
        && !options.dry_run
        && !prompt::confirm(&format!(
            "Permanently delete everything selected in '{organization}'?"
        ))?
    {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let transport = UreqTransport::new();
    let credential = authenticate(
        &input,
        mode,
        &config.auth.oauth_client(),
        &config.endpoints.token,
        &transport,
    )
    .context("Authentication failed")?;
    ui::success(&format!("Authenticated as {} ({mode})", input.username));
    let org = OrgContext::new(organization, credential);

    let cancel = CancelToken::new();
    if let Err(e) = signal::install(&cancel) {
        log::warn!("Ctrl-C will abort immediately: {e}");
    }

    let mut reporter = Reporter::new(TerminalSink::new(ctx.quiet));
    reporter.redactor_mut().protect(input.password.expose_secret());

    let client = ManagementClient::new(&transport, &config.endpoints, &org);
    let report = Executor::new(client, &options)
        .with_cancel(cancel)
        .run(&mut reporter);

    print_summary(&report);

    if let Some(path) = &args.report {
        write_report(&report, path)?;
        ui::info(&format!("Run report written to {}", path.display()));
    }

    verdict(&report)
}

fn selection_label(only: &[CategoryKind]) -> String {
    if only.is_empty() {
        "all".to_string()
    } else {
        only.iter()
            .map(|kind| kind.key())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn print_summary(report: &RunReport) {
    let summary = report.summary();

    ui::header("Summary");
    if report.dry_run {
        ui::kv("Would delete", &summary.planned.to_string());
    } else {
        ui::kv("Deleted", &summary.deleted.to_string());
    }
    ui::kv("Excluded", &summary.excluded.to_string());
    ui::kv("Empty listings", &summary.empty_listings.to_string());
    if summary.failed_listings > 0 {
        ui::kv("Failed listings", &summary.failed_listings.to_string());
    }
    if summary.failed_undeploys > 0 {
        ui::kv("Failed undeploys", &summary.failed_undeploys.to_string());
    }
    if summary.failed > 0 {
        ui::kv("Failed", &summary.failed.to_string());
    }
    ui::kv("Started", &local_time(report.started_at));
    if let Some(finished) = report.finished_at {
        ui::kv("Elapsed", &elapsed_label(report.started_at, finished));
    }
    println!();
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn elapsed_label(started: DateTime<Utc>, finished: DateTime<Utc>) -> String {
    let seconds = (finished - started).num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else {
        format!("{}m {:02}s", seconds / 60, seconds % 60)
    }
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, content)
        .with_context(|| format!("Could not write run report: {}", path.display()))
}

/// Clean runs succeed; anything else becomes a non-zero exit.
fn verdict(report: &RunReport) -> Result<()> {
    if report.is_clean() {
        ui::success("Teardown completed cleanly");
        return Ok(());
    }
    if report.cancelled {
        bail!("Teardown cancelled before completion");
    }

    let summary = report.summary();
    let failures = summary.failed + summary.failed_undeploys + summary.failed_listings;
    bail!(
        "Teardown finished with {}",
        ui::count(failures, "failure", "failures")
    )
}
