use std::{process, sync::Arc};

use cfpurge::{
    application::{
        coordinator::PurgeCoordinator,
        error::AppError,
        provider::EdgeCacheProvider,
        repos::SiteSettingsRepo,
        resolver::{ConfigResolver, StaticPurgeConfig},
        settings_panel::SettingsPanel,
        targets::PurgeTargetBuilder,
    },
    config,
    domain::content::{PurgeLinks, PurgeSubject},
    infra::{cloudflare::CloudflareClient, settings_store::TomlSiteSettingsStore, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

/// Wiring shared by every subcommand.
struct Runtime {
    resolver: Arc<ConfigResolver>,
    site_settings: Arc<dyn SiteSettingsRepo>,
    provider: Arc<dyn EdgeCacheProvider>,
}

impl Runtime {
    fn build(settings: &config::Settings) -> Result<Self, AppError> {
        let site_settings: Arc<dyn SiteSettingsRepo> =
            Arc::new(TomlSiteSettingsStore::new(settings.site.settings_file.clone()));
        let provider: Arc<dyn EdgeCacheProvider> = Arc::new(CloudflareClient::new(
            &settings.cloudflare.api_base,
            settings.cloudflare.timeout,
        )?);
        let resolver = Arc::new(ConfigResolver::new(
            StaticPurgeConfig::from(&settings.cloudflare),
            site_settings.clone(),
        ));

        Ok(Self {
            resolver,
            site_settings,
            provider,
        })
    }
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    let runtime = Runtime::build(&settings)?;

    match cli_args.command {
        config::Command::Zones => run_zones(&runtime).await,
        config::Command::Settings => run_settings(&runtime).await,
        config::Command::Purge(args) => run_purge(&runtime, &settings, args).await,
    }
}

async fn run_zones(runtime: &Runtime) -> Result<(), AppError> {
    let zones = runtime.resolver.list_zones(runtime.provider.as_ref()).await?;
    if zones.is_empty() {
        info!("no zones available for the configured credentials");
    }
    for zone in zones {
        println!("{}\t{}", zone.id, zone.name);
    }
    Ok(())
}

async fn run_settings(runtime: &Runtime) -> Result<(), AppError> {
    let panel = SettingsPanel::build(
        &runtime.resolver,
        runtime.site_settings.as_ref(),
        runtime.provider.as_ref(),
    )
    .await;
    let panel = AppError::require_panel(panel)?;
    print_json(&panel)
}

async fn run_purge(
    runtime: &Runtime,
    settings: &config::Settings,
    args: config::PurgeArgs,
) -> Result<(), AppError> {
    let coordinator = PurgeCoordinator::new(
        runtime.resolver.clone(),
        PurgeTargetBuilder::new(settings.site.base_url.clone()),
        runtime.provider.clone(),
        settings.purge.write_policy,
    );

    let subject = CliSubject {
        object_id: args.object_id,
        versioned: args.versioned,
        opt_in_write: args.opt_in_write,
        links: args.links,
    };

    let report = coordinator.handle(&subject, args.event.into()).await;
    info!(
        event_id = %report.event_id,
        decision = %report.decision,
        clean = report.is_clean(),
        "purge finished"
    );
    print_json(&report)
}

/// Ad-hoc content object described on the command line.
struct CliSubject {
    object_id: String,
    versioned: bool,
    opt_in_write: bool,
    links: Vec<String>,
}

impl PurgeSubject for CliSubject {
    fn object_id(&self) -> String {
        self.object_id.clone()
    }

    fn is_versioned(&self) -> bool {
        self.versioned
    }

    fn purge_links(&self) -> Option<PurgeLinks> {
        Some(PurgeLinks::Many(self.links.clone()))
    }

    fn purge_on_write(&self) -> Option<bool> {
        self.opt_in_write.then_some(true)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{out}");
    Ok(())
}
