//! Configurator demo - walks a configuration session end to end
//!
//! Loads a catalog and wizard settings, opens a session for an order,
//! fills every page of the wizard and prints the rendered dynamic form of
//! each page followed by the finished variant.
//!
//! Values are picked from `--select ATTRIBUTE=VALUE` arguments; required
//! fields without a selection fall back to their first available value.

use anyhow::{bail, Context, Result};
use clap::Parser;
use configurator_engine::{
    AdvanceOutcome, ConfiguratorEngine, Direction, InMemoryCatalog, InMemoryOrderBook,
    InMemoryVariantFactory, JsonViewRenderer,
};
use configurator_types::{
    AttributeId, FieldDescriptor, FieldId, FieldKind, FieldValue, LayoutNode, OrderId, SessionId,
    TemplateId, ValueId, WizardConfig,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SAMPLE_CATALOG: &str = include_str!("../fixtures/catalog.json");

type Engine = ConfiguratorEngine<InMemoryCatalog, InMemoryVariantFactory, InMemoryOrderBook>;

/// Configurator demo CLI
#[derive(Parser)]
#[command(name = "configurator-demo")]
#[command(about = "Walk a product configuration session end to end", long_about = None)]
#[command(version)]
struct Cli {
    /// Wizard configuration file (TOML)
    #[arg(short, long, env = "CONFIGURATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog file (JSON); the bundled sample catalog is used when omitted
    #[arg(long, env = "CONFIGURATOR_CATALOG")]
    catalog: Option<PathBuf>,

    /// Template to configure
    #[arg(short, long, default_value_t = 1)]
    template: u64,

    /// Order the finished product is added to
    #[arg(short, long, default_value_t = 1)]
    order: u64,

    /// Selection as ATTRIBUTE=VALUE, may be repeated
    #[arg(short, long = "select", value_parser = parse_selection)]
    selections: Vec<(AttributeId, ValueId)>,

    /// Skip printing the rendered form of each page
    #[arg(long)]
    quiet: bool,

    /// Log level
    #[arg(long, env = "CONFIGURATOR_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_selection(raw: &str) -> Result<(AttributeId, ValueId), String> {
    let (attribute, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ATTRIBUTE=VALUE, got '{}'", raw))?;
    let attribute = attribute
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid attribute id '{}': {}", attribute, e))?;
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid value id '{}': {}", value, e))?;
    Ok((AttributeId(attribute), ValueId(value)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config = match &cli.config {
        Some(path) => WizardConfig::load(path)
            .with_context(|| format!("loading wizard config from {}", path.display()))?,
        None => WizardConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            InMemoryCatalog::from_json(&json)?
        }
        None => InMemoryCatalog::from_json(SAMPLE_CATALOG)?,
    };
    tracing::info!(templates = catalog.template_count(), "Catalog loaded");

    let base = LayoutNode::group(
        "form",
        vec![LayoutNode::group(config.static_form_anchor.clone(), vec![])],
    );
    let selections: BTreeMap<AttributeId, ValueId> = cli.selections.iter().copied().collect();

    let mut engine = ConfiguratorEngine::new(
        config,
        catalog,
        InMemoryVariantFactory::new(),
        InMemoryOrderBook::new(),
    )?;
    let session = engine.open_session_for_order(OrderId(cli.order));
    engine.assign_template(&session, TemplateId(cli.template))?;

    loop {
        let edits = fill_page(&engine, &session, &selections)?;
        engine.save(&session, &edits)?;

        if !cli.quiet {
            let view = engine.render(&session, &base, &JsonViewRenderer::pretty())?;
            println!("{}", view);
        }

        match engine.advance(&session, Direction::Next)? {
            AdvanceOutcome::Moved(state) => {
                tracing::info!(session_id = %session, state = %state, "Next page");
            }
            AdvanceOutcome::Completed(completion) => {
                let summary = serde_json::json!({
                    "product": completion.product,
                    "order_line_id": completion.order_line_id,
                    "order_lines": engine.orders().lines_of(OrderId(cli.order)),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
        }
    }
}

/// Edits for the editable fields of the current page.
///
/// Each pick is propagated against the edits made so far, so later picks
/// see the domains left by earlier ones.
fn fill_page(
    engine: &Engine,
    session: &SessionId,
    selections: &BTreeMap<AttributeId, ValueId>,
) -> Result<BTreeMap<FieldId, FieldValue>> {
    let fields = engine.synthesize(session)?;
    let custom_option = engine.config().custom_option_id;
    let mut edits = BTreeMap::new();

    let mut editable: Vec<&FieldDescriptor> = fields
        .values()
        .filter(|f| f.id.kind == FieldKind::Attribute && f.visible && !f.readonly)
        .collect();
    editable.sort_by_key(|f| (f.sequence, f.id));

    for field in editable {
        let attribute_id = field.id.attribute_id;
        let pick = match selections.get(&attribute_id) {
            Some(value) => Some(*value),
            None if field.required => {
                let first = field
                    .candidate_values
                    .iter()
                    .copied()
                    .find(|v| *v != custom_option);
                if first.is_none() {
                    bail!("no value available for required field {}", field.label);
                }
                first
            }
            None => None,
        };
        let Some(value) = pick else {
            continue;
        };

        let value = if field.is_multi() {
            FieldValue::Multi([value].into_iter().collect())
        } else {
            FieldValue::Single(value)
        };
        let outcome = engine.propagate(session, &edits, field.id, value.clone())?;
        edits.insert(field.id, value);
        edits.extend(outcome.updated_values);
    }

    Ok(edits)
}
