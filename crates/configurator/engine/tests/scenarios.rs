//! End-to-end test: wizard sessions driven through the engine.
//!
//! Verifies that:
//! - fields, domains and propagation follow the dependency rules
//! - step lines gate visibility and navigation
//! - template reassignment and finalization guard the session
//! - finalization is all-or-nothing towards the session

use configurator_engine::*;
use configurator_types::*;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Engine = ConfiguratorEngine<InMemoryCatalog, InMemoryVariantFactory, InMemoryOrderBook>;

const COLOR: AttributeId = AttributeId(1);
const RED: ValueId = ValueId(11);
const BLUE: ValueId = ValueId(12);

const FRAME: AttributeId = AttributeId(2);
const X: ValueId = ValueId(21);
const Y: ValueId = ValueId(22);

const PAINT: AttributeId = AttributeId(3);
const P: ValueId = ValueId(31);
const Q: ValueId = ValueId(32);

const TRIM: AttributeId = AttributeId(4);
const CHROME: ValueId = ValueId(41);
const BLACK: ValueId = ValueId(42);

const SEAT: AttributeId = AttributeId(5);
const LEATHER: ValueId = ValueId(51);

const PRINT: AttributeId = AttributeId(6);
const LOGO: ValueId = ValueId(61);

const CAPTION: AttributeId = AttributeId(7);
const PLAIN: ValueId = ValueId(71);

fn ids(values: &[ValueId]) -> BTreeSet<ValueId> {
    values.iter().copied().collect()
}

fn edit(attribute_id: AttributeId, value: FieldValue) -> BTreeMap<FieldId, FieldValue> {
    [(FieldId::attribute(attribute_id), value)].into_iter().collect()
}

fn values() -> Vec<AttributeValue> {
    vec![
        AttributeValue::new(RED, COLOR, "Red"),
        AttributeValue::new(BLUE, COLOR, "Blue"),
        AttributeValue::new(X, FRAME, "Steel"),
        AttributeValue::new(Y, FRAME, "Carbon"),
        AttributeValue::new(P, PAINT, "Gloss"),
        AttributeValue::new(Q, PAINT, "Matte"),
        AttributeValue::new(CHROME, TRIM, "Chrome"),
        AttributeValue::new(BLACK, TRIM, "Black"),
        AttributeValue::new(LEATHER, SEAT, "Leather"),
        AttributeValue::new(LOGO, PRINT, "Logo"),
        AttributeValue::new(PLAIN, CAPTION, "Plain"),
    ]
}

/// Template 1: a single required color line, no steps.
fn shirt() -> ProductTemplate {
    ProductTemplate::new(TemplateId(1), "Shirt").with_line(
        AttributeLine::new(Attribute::new(COLOR, "Color"), [RED, BLUE]).required(),
    )
}

/// Template 2: frame and paint lines, no steps.
fn bike() -> ProductTemplate {
    ProductTemplate::new(TemplateId(2), "Bike")
        .with_line(
            AttributeLine::new(Attribute::new(FRAME, "Frame"), [X, Y])
                .required()
                .with_sequence(1),
        )
        .with_line(AttributeLine::new(Attribute::new(PAINT, "Paint"), [P, Q]).with_sequence(2))
}

/// Template 3: frame on step 1, paint on step 2.
fn stepped_bike() -> ProductTemplate {
    ProductTemplate::new(TemplateId(3), "Stepped Bike")
        .with_line(
            AttributeLine::new(Attribute::new(FRAME, "Frame"), [X, Y])
                .required()
                .with_sequence(1),
        )
        .with_line(AttributeLine::new(Attribute::new(PAINT, "Paint"), [P, Q]).with_sequence(2))
        .with_step(
            ConfigStepLine::new(StepLineId(1), "Frame")
                .with_attribute(FRAME)
                .with_sequence(1),
        )
        .with_step(
            ConfigStepLine::new(StepLineId(2), "Paint")
                .with_attribute(PAINT)
                .with_sequence(2),
        )
}

/// Template 4: trim on the only step, seat owned by no step.
fn cruiser() -> ProductTemplate {
    ProductTemplate::new(TemplateId(4), "Cruiser")
        .with_line(
            AttributeLine::new(Attribute::new(SEAT, "Seat"), [LEATHER])
                .required()
                .with_sequence(1),
        )
        .with_line(AttributeLine::new(Attribute::new(TRIM, "Trim"), [CHROME, BLACK]).with_sequence(2))
        .with_step(ConfigStepLine::new(StepLineId(3), "Trim").with_attribute(TRIM))
}

/// Template 5: a required print and an optional caption, both custom.
fn poster() -> ProductTemplate {
    ProductTemplate::new(TemplateId(5), "Poster")
        .with_line(
            AttributeLine::new(Attribute::new(PRINT, "Print"), [LOGO])
                .custom()
                .required()
                .with_sequence(1),
        )
        .with_line(
            AttributeLine::new(Attribute::new(CAPTION, "Caption"), [PLAIN])
                .custom()
                .with_sequence(2),
        )
}

fn build(rules: Vec<DependencyRule>) -> Engine {
    let mut catalog = InMemoryCatalog::new();
    for template in [shirt(), bike(), stepped_bike(), cruiser(), poster()] {
        catalog.register_template(template).unwrap();
    }
    for value in values() {
        catalog.register_value(value);
    }
    for rule in rules {
        catalog.register_rule(rule);
    }
    ConfiguratorEngine::new(
        WizardConfig::default(),
        catalog,
        InMemoryVariantFactory::new(),
        InMemoryOrderBook::new(),
    )
    .unwrap()
}

/// Paint `P` requires frame `X`
fn gloss_needs_steel() -> DependencyRule {
    DependencyRule::requires(PAINT, [P], FRAME, [X])
}

// ---------------------------------------------------------------------------
// Fields and propagation
// ---------------------------------------------------------------------------

#[test]
fn single_required_line_without_rules() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(1)).unwrap();

    let fields = engine.synthesize(&session).unwrap();
    let selectors: Vec<&FieldDescriptor> = fields
        .values()
        .filter(|f| f.id.kind == FieldKind::Attribute)
        .collect();
    assert_eq!(selectors.len(), 1);
    assert!(selectors[0].required);
    assert!(selectors[0].visible);
    assert_eq!(selectors[0].candidate_values, ids(&[RED, BLUE]));

    let outcome = engine
        .propagate(
            &session,
            &BTreeMap::new(),
            FieldId::attribute(COLOR),
            FieldValue::Single(RED),
        )
        .unwrap();
    assert!(outcome.is_quiet());
    assert_eq!(
        outcome.domains,
        [(FieldId::attribute(COLOR), ids(&[RED, BLUE]))].into_iter().collect()
    );
}

#[test]
fn requires_rule_defaults_invalid_selection() {
    let mut engine = build(vec![gloss_needs_steel()]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(2)).unwrap();
    engine.save(&session, &edit(FRAME, FieldValue::Single(Y))).unwrap();

    let fields = engine.synthesize(&session).unwrap();
    assert_eq!(fields[&FieldId::attribute(PAINT)].candidate_values, ids(&[Q]));

    let outcome = engine
        .propagate(
            &session,
            &BTreeMap::new(),
            FieldId::attribute(PAINT),
            FieldValue::Single(P),
        )
        .unwrap();
    assert_eq!(
        outcome.updated_values.get(&FieldId::attribute(PAINT)),
        Some(&FieldValue::Single(Q))
    );
    assert_eq!(outcome.domains[&FieldId::attribute(PAINT)], ids(&[Q]));
    assert!(outcome.passes <= 2);

    // propagation only reports; the stored session is unchanged
    assert!(!engine.session(&session).unwrap().value_ids.contains(&Q));
}

#[test]
fn propagation_uses_view_values_over_stored_ones() {
    let mut engine = build(vec![gloss_needs_steel()]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(2)).unwrap();
    engine.save(&session, &edit(FRAME, FieldValue::Single(Y))).unwrap();

    // the view already shows the steel frame
    let view = edit(FRAME, FieldValue::Single(X));
    let outcome = engine
        .propagate(&session, &view, FieldId::attribute(PAINT), FieldValue::Single(P))
        .unwrap();
    assert!(outcome.is_quiet());
    assert_eq!(outcome.domains[&FieldId::attribute(PAINT)], ids(&[P, Q]));
}

#[test]
fn malformed_edit_is_rejected_without_side_effects() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(2)).unwrap();
    engine.save(&session, &edit(FRAME, FieldValue::Single(X))).unwrap();

    let mut edits = edit(PAINT, FieldValue::Single(Q));
    edits.insert(FieldId::attribute(FRAME), FieldValue::Multi(ids(&[X, Y])));
    let err = engine.save(&session, &edits).unwrap_err();
    assert!(matches!(err, ConfiguratorError::MalformedFieldValue { .. }));
    assert_eq!(engine.session(&session).unwrap().value_ids, ids(&[X]));

    let err = engine
        .save(&session, &edit(COLOR, FieldValue::Single(RED)))
        .unwrap_err();
    assert!(matches!(err, ConfiguratorError::UnknownAttribute { .. }));
}

#[test]
fn rendering_repairs_stale_selection() {
    let mut engine = build(vec![gloss_needs_steel()]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(2)).unwrap();

    let mut edits = edit(FRAME, FieldValue::Single(Y));
    edits.insert(FieldId::attribute(PAINT), FieldValue::Single(P));
    engine.save(&session, &edits).unwrap();

    let base = LayoutNode::group("form", vec![LayoutNode::group("static_form", vec![])]);
    let json = engine
        .render(&session, &base, &JsonViewRenderer::pretty())
        .unwrap();
    assert!(json.contains("dynamic_form"));

    let stored = &engine.session(&session).unwrap().value_ids;
    assert_eq!(*stored, ids(&[Y, Q]));
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[test]
fn step_lines_gate_visibility() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    let state = engine.assign_template(&session, TemplateId(3)).unwrap();
    assert_eq!(state, WizardState::Step(StepLineId(1)));

    let fields = engine.synthesize(&session).unwrap();
    let frame = &fields[&FieldId::attribute(FRAME)];
    assert!(frame.visible);
    assert!(!frame.readonly);
    let paint = &fields[&FieldId::attribute(PAINT)];
    assert!(!paint.visible);
    assert!(paint.readonly);
}

#[test]
fn navigation_walks_open_steps_and_back() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(3)).unwrap();

    let labels: Vec<String> = engine
        .state_selection(&session)
        .unwrap()
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    assert_eq!(labels, vec!["Select Template", "Frame", "Paint"]);

    engine.save(&session, &edit(FRAME, FieldValue::Single(X))).unwrap();
    assert_eq!(
        engine.advance(&session, Direction::Next).unwrap(),
        AdvanceOutcome::Moved(WizardState::Step(StepLineId(2)))
    );
    assert_eq!(
        engine.advance(&session, Direction::Previous).unwrap(),
        AdvanceOutcome::Moved(WizardState::Step(StepLineId(1)))
    );
    assert_eq!(
        engine.advance(&session, Direction::Previous).unwrap(),
        AdvanceOutcome::Moved(WizardState::Select)
    );
}

#[test]
fn closed_steps_are_skipped() {
    let mut engine = build(vec![DependencyRule::requires(PAINT, [P, Q], FRAME, [X])]);
    let session = engine.open_session_for_order(OrderId(4));
    engine.assign_template(&session, TemplateId(3)).unwrap();
    engine.save(&session, &edit(FRAME, FieldValue::Single(Y))).unwrap();

    // carbon frames leave nothing to pick on the paint step
    let outcome = engine.advance(&session, Direction::Next).unwrap();
    let AdvanceOutcome::Completed(done) = outcome else {
        panic!("expected completion, got {:?}", outcome);
    };
    assert_eq!(done.product.display_name, "Stepped Bike (Carbon)");
    assert_eq!(engine.orders().lines_of(OrderId(4)).len(), 1);
}

#[test]
fn template_with_every_step_closed_is_configured_on_one_page() {
    // trim needs a seat, so with nothing selected the trim step is closed
    let mut engine = build(vec![DependencyRule::requires(TRIM, [CHROME, BLACK], SEAT, [LEATHER])]);
    let session = engine.open_session_for_order(OrderId(6));
    assert_eq!(
        engine.assign_template(&session, TemplateId(4)).unwrap(),
        WizardState::Configure
    );

    // the session the engine produced can be persisted and resumed
    let stored = engine.discard_session(&session).unwrap();
    let session = engine.restore_session(stored.clone()).unwrap();
    assert_eq!(engine.session(&session).unwrap(), &stored);

    let fields = engine.synthesize(&session).unwrap();
    let seat = &fields[&FieldId::attribute(SEAT)];
    assert!(seat.visible && !seat.readonly && seat.required);
    assert!(fields[&FieldId::attribute(TRIM)].visible);

    let base = LayoutNode::group("form", vec![LayoutNode::group("static_form", vec![])]);
    let layout = engine.materialize(&session, &base).unwrap();
    let seat_node = layout
        .fields()
        .into_iter()
        .find(|f| f.field == FieldId::attribute(SEAT))
        .cloned()
        .unwrap();
    assert!(!seat_node
        .modifiers
        .is_invisible(&WizardState::Configure, &BTreeMap::new()));

    // nothing selected: the required seat blocks completion
    let err = engine.finalize(&session).unwrap_err();
    assert!(matches!(err, ConfiguratorError::InvalidConfiguration(_)));
    assert!(engine.session(&session).is_ok());
    assert_eq!(engine.variants().count(), 0);

    // a seat opens the trim step, which the wizard then walks through
    engine.save(&session, &edit(SEAT, FieldValue::Single(LEATHER))).unwrap();
    assert_eq!(
        engine.advance(&session, Direction::Next).unwrap(),
        AdvanceOutcome::Moved(WizardState::Step(StepLineId(3)))
    );
    let AdvanceOutcome::Completed(done) = engine.advance(&session, Direction::Next).unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(done.product.display_name, "Cruiser (Leather)");
}

// ---------------------------------------------------------------------------
// Session guards
// ---------------------------------------------------------------------------

#[test]
fn reassigning_template_with_selections_conflicts() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(1)).unwrap();
    engine.save(&session, &edit(COLOR, FieldValue::Single(BLUE))).unwrap();

    let err = engine.assign_template(&session, TemplateId(2)).unwrap_err();
    assert!(matches!(err, ConfiguratorError::ConfigurationConflict(_)));

    // clearing the selection makes the switch legal again
    engine.save(&session, &edit(COLOR, FieldValue::Empty)).unwrap();
    assert_eq!(
        engine.assign_template(&session, TemplateId(2)).unwrap(),
        WizardState::Configure
    );
}

#[test]
fn finalize_with_missing_required_value_keeps_session() {
    let mut engine = build(vec![]);
    let session = engine.open_session();
    engine.assign_template(&session, TemplateId(2)).unwrap();
    engine.save(&session, &edit(PAINT, FieldValue::Single(Q))).unwrap();

    let err = engine.advance(&session, Direction::Next).unwrap_err();
    assert!(matches!(err, ConfiguratorError::InvalidConfiguration(_)));

    let loaded = engine.load(&session).unwrap();
    assert_eq!(loaded[&FieldId::attribute(PAINT)], FieldValue::Single(Q));
    assert_eq!(loaded[&FieldId::attribute(FRAME)], FieldValue::Empty);
    assert_eq!(engine.variants().count(), 0);
}

#[test]
fn custom_option_without_custom_value_blocks_finalize() {
    let mut engine = build(vec![]);
    let custom_option = engine.config().custom_option_id;
    let session = engine.open_session_for_order(OrderId(8));
    engine.assign_template(&session, TemplateId(5)).unwrap();

    // custom option picked, companion field left empty
    engine
        .save(&session, &edit(PRINT, FieldValue::Single(custom_option)))
        .unwrap();
    assert!(engine.synthesize(&session).unwrap()[&FieldId::custom(PRINT)].required);

    let err = engine.finalize(&session).unwrap_err();
    assert!(matches!(err, ConfiguratorError::InvalidConfiguration(_)));
    assert_eq!(err.to_string(), "Invalid configuration: a custom value is required for Print");

    // whitespace does not count as a value either
    let mut edits = edit(PRINT, FieldValue::Single(custom_option));
    edits.insert(FieldId::custom(PRINT), FieldValue::Text("  ".into()));
    engine.save(&session, &edits).unwrap();
    assert!(engine.finalize(&session).is_err());

    // an optional line picking the custom option needs a value too
    let mut edits = edit(PRINT, FieldValue::Single(custom_option));
    edits.insert(FieldId::custom(PRINT), FieldValue::Text("Sunset".into()));
    edits.insert(FieldId::attribute(CAPTION), FieldValue::Single(custom_option));
    engine.save(&session, &edits).unwrap();
    let err = engine.finalize(&session).unwrap_err();
    assert!(matches!(err, ConfiguratorError::InvalidConfiguration(_)));
    assert!(engine.session(&session).is_ok());
    assert_eq!(engine.variants().count(), 0);
    assert!(engine.orders().lines_of(OrderId(8)).is_empty());

    engine.save(&session, &edit(CAPTION, FieldValue::Empty)).unwrap();
    let done = engine.finalize(&session).unwrap();
    assert_eq!(done.product.display_name, "Poster (Sunset)");
}

#[test]
fn failed_order_attachment_keeps_session() {
    let mut engine = build(vec![]);
    let mut stored = ConfigurationSession::new().with_order_line(OrderLineId(99));
    stored.product_tmpl_id = Some(TemplateId(1));
    stored.state = WizardState::Configure;
    stored.value_ids = ids(&[RED]);
    let session = engine.restore_session(stored).unwrap();

    let err = engine.finalize(&session).unwrap_err();
    assert!(matches!(err, ConfiguratorError::Collaborator(_)));
    assert_eq!(engine.session(&session).unwrap().value_ids, ids(&[RED]));
}

#[test]
fn reconfigured_variant_replaces_order_line_product() {
    let mut engine = build(vec![]);
    let first = engine.open_session_for_order(OrderId(1));
    engine.assign_template(&first, TemplateId(1)).unwrap();
    engine.save(&first, &edit(COLOR, FieldValue::Single(RED))).unwrap();
    let AdvanceOutcome::Completed(done) = engine.advance(&first, Direction::Next).unwrap() else {
        panic!("expected completion");
    };
    let line_id = done.order_line_id.unwrap();
    assert_eq!(done.product.display_name, "Shirt (Red)");

    let session = engine.open_for_product(done.product.id, Some(line_id)).unwrap();
    assert_eq!(
        engine.load(&session).unwrap()[&FieldId::attribute(COLOR)],
        FieldValue::Single(RED)
    );
    engine.save(&session, &edit(COLOR, FieldValue::Single(BLUE))).unwrap();
    let AdvanceOutcome::Completed(redone) = engine.advance(&session, Direction::Next).unwrap()
    else {
        panic!("expected completion");
    };

    assert_ne!(redone.product.id, done.product.id);
    assert_eq!(redone.order_line_id, Some(line_id));
    let line = engine.orders().line(line_id).unwrap();
    assert_eq!(line.product_id, redone.product.id);
    assert_eq!(engine.orders().lines_of(OrderId(1)).len(), 1);
}
