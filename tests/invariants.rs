//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use chrono::{FixedOffset, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use flyerstudio_core::{
    normalize, project, resolve, select_template,
    store::{InMemoryDesigns, InMemoryTenants},
    templates::{TemplateDraft, TemplateRegistry},
    zones::is_fully_locked,
    Bindings, CanvasDocument, DesignTemplate, Event, ExplicitMissPolicy, FlyerGenerator,
    StudioConfig, TemplateCategory, Tenant, Validator, Zone,
};

const TENANT: u128 = 0x61;
const USER: u128 = 0x99;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn gci() -> Tenant {
    Tenant {
        id: Uuid::from_u128(TENANT),
        name: "GCI".to_string(),
        slug: Some("gci".to_string()),
        logo_url: None,
        brand_config: None,
    }
}

fn sunday_service() -> Event {
    serde_json::from_value(json!({
        "id": Uuid::from_u128(0x500),
        "tenant_id": Uuid::from_u128(TENANT),
        "title": "Sunday Service",
        "start_datetime": "2027-01-05T09:05:00Z",
        "venue_name": "Main Hall",
        "created_by": Uuid::from_u128(USER)
    }))
    .unwrap()
}

fn flyer_canvas() -> CanvasDocument {
    CanvasDocument::from_value(json!({
        "version": "5.3.0",
        "objects": [
            {
                "type": "rect", "left": 0, "top": 0, "width": 800, "height": 1000,
                "fill": "{{tenant.brand_config.primary_color}}",
                "selectable": false, "_cp_locked": true, "_cp_role": "background"
            },
            {
                "type": "text", "left": 400, "top": 300, "originX": "center",
                "text": "{{event.title}}", "fontFamily": "{{tenant.brand_config.fonts.heading}}",
                "fontSize": 80, "_cp_role": "title", "_cp_data_binding": "event.title"
            },
            {
                "type": "text", "left": 400, "top": 500, "originX": "center",
                "text": "{{event.date}} @ {{event.time}}",
                "_cp_data_binding": "event.start_datetime"
            },
            {
                "type": "text", "left": 400, "top": 600,
                "text": "{{event.venue}} {{event.speaker}}"
            }
        ]
    }))
    .unwrap()
}

fn tenant_template(day: u32) -> DesignTemplate {
    let mut template = DesignTemplate::new(
        "GCI Sunday Service Default",
        TemplateCategory::Event,
        normalize(&flyer_canvas()),
        Uuid::from_u128(USER),
    );
    template.tenant_id = Some(Uuid::from_u128(TENANT));
    template.created_at = Utc.with_ymd_and_hms(2026, 6, day, 12, 0, 0).unwrap();
    template
}

#[test]
fn invariant_end_to_end_flyer() {
    let bindings = project(&sunday_service(), &gci(), utc()).unwrap();
    let resolved = resolve(&flyer_canvas(), &bindings);

    assert_eq!(resolved.objects[1].text.as_deref(), Some("Sunday Service"));
    assert_eq!(resolved.objects[2].text.as_deref(), Some("Jan 5, 2027 @ 9:05 AM"));
    assert_eq!(resolved.objects[3].text.as_deref(), Some("Main Hall {{event.speaker}}"));
    assert_eq!(resolved.objects[0].style.fill_color(), Some("#1a365d"));
    assert_eq!(resolved.objects[1].style.font_family.as_deref(), Some("Inter"));
}

#[test]
fn invariant_substitution_keeps_structure() {
    let original = flyer_canvas();
    let bindings = project(&sunday_service(), &gci(), utc()).unwrap();
    let resolved = resolve(&original, &bindings);

    assert_eq!(resolved.objects.len(), original.objects.len());
    for (before, after) in original.objects.iter().zip(&resolved.objects) {
        assert_eq!(before.kind, after.kind);
        assert_eq!(before.geometry, after.geometry);
        assert_eq!(before.governance, after.governance);
    }
    assert_eq!(resolved.version, original.version);
}

#[test]
fn invariant_locking_coercion() {
    let canvas = CanvasDocument::from_value(json!({
        "objects": [{"type": "rect", "_cp_locked": true}, {"type": "text"}]
    }))
    .unwrap();
    let value = normalize(&canvas).to_value().unwrap();

    assert_eq!(
        value["objects"][0],
        json!({
            "type": "rect",
            "_cp_zone": "protected",
            "_cp_locked": true,
            "selectable": false,
            "evented": false,
            "hasControls": false,
            "lockMovementX": true,
            "lockMovementY": true,
            "lockScalingX": true,
            "lockScalingY": true,
            "lockRotation": true
        })
    );
    assert_eq!(
        value["objects"][1],
        json!({"type": "text", "_cp_zone": "safe", "_cp_locked": false})
    );
}

#[test]
fn invariant_normalize_idempotent_on_stored_template() {
    let once = normalize(&flyer_canvas());
    assert_eq!(normalize(&once), once);
    for object in &once.objects {
        if object.governance.zone == Some(Zone::Protected) {
            assert!(is_fully_locked(object));
        }
    }
}

#[test]
fn invariant_selection_priority() {
    let mut registry = TemplateRegistry::new();
    let tenant = tenant_template(1);
    let mut global = tenant_template(20);
    global.tenant_id = None;
    let mut explicit = tenant_template(2);
    explicit.category = TemplateCategory::Banner;
    let (tenant_id, global_id, explicit_id) = (tenant.id, global.id, explicit.id);
    registry.register(tenant);
    registry.register(global);
    registry.register(explicit);

    let event = sunday_service();
    let picked = select_template(&registry, &event, &TemplateCategory::Event, ExplicitMissPolicy::Stop);
    assert_eq!(picked.map(|s| s.template.id), Some(tenant_id));

    let mut other_tenant = sunday_service();
    other_tenant.tenant_id = Uuid::from_u128(0x62);
    let picked = select_template(&registry, &other_tenant, &TemplateCategory::Event, ExplicitMissPolicy::Stop);
    assert_eq!(picked.map(|s| s.template.id), Some(global_id));

    let mut pinned = sunday_service();
    pinned.flyer_template_id = Some(explicit_id);
    let picked = select_template(&registry, &pinned, &TemplateCategory::Event, ExplicitMissPolicy::Stop);
    assert_eq!(picked.map(|s| s.template.id), Some(explicit_id));

    let empty = TemplateRegistry::new();
    assert!(select_template(&empty, &event, &TemplateCategory::Event, ExplicitMissPolicy::Stop).is_none());
}

#[test]
fn invariant_projection_fallbacks() {
    let mut event = sunday_service();
    event.venue_name = None;
    let bindings = project(&event, &gci(), utc()).unwrap();
    assert_eq!(bindings.get("event.venue"), Some(""));
    assert_eq!(bindings.get("tenant.brand_config.primary_color"), Some("#1a365d"));
}

#[test]
fn invariant_authoring_normalizes_and_generation_uses_it() {
    let draft: TemplateDraft = serde_json::from_value(json!({
        "tenant_id": Uuid::from_u128(TENANT),
        "name": "Authored",
        "category": "event",
        "width": 800,
        "height": 1000,
        "canvas_json": flyer_canvas()
    }))
    .unwrap();

    let mut registry = TemplateRegistry::new();
    let template = registry.create(draft, Uuid::from_u128(USER), &Validator::default()).unwrap();
    assert!(template.canvas_json.objects.iter().all(|o| o.governance.zone.is_some()));

    let mut tenants = InMemoryTenants::new();
    tenants.insert(gci());
    let config = StudioConfig::default();
    let generator = FlyerGenerator::new(&registry, &tenants, &config);
    let mut designs = InMemoryDesigns::new();
    let mut event = sunday_service();

    let design_id = generator
        .handle_event_created(&mut designs, &mut event, Uuid::from_u128(USER))
        .expect("design generated");
    assert_eq!(event.generated_design_id, Some(design_id));

    let design = &designs.designs()[0];
    assert_eq!(design.template_id, template.id);
    assert_eq!(design.name, "Flyer: Sunday Service");
    assert_eq!(design.canvas_json.objects[2].text.as_deref(), Some("Jan 5, 2027 @ 9:05 AM"));
    // Protection set at authoring time carries into the design.
    assert!(is_fully_locked(&design.canvas_json.objects[0]));
}

#[test]
fn invariant_retry_is_deterministic() {
    let mut registry = TemplateRegistry::new();
    registry.register(tenant_template(1));
    let mut tenants = InMemoryTenants::new();
    tenants.insert(gci());
    let config = StudioConfig::default();
    let generator = FlyerGenerator::new(&registry, &tenants, &config);

    let event = sunday_service();
    let first = generator.generate(&event, Uuid::from_u128(USER)).unwrap().unwrap();
    let second = generator.generate(&event, Uuid::from_u128(USER)).unwrap().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(first.canvas_json, second.canvas_json);
}

#[test]
fn invariant_reference_offset_applies() {
    let mut registry = TemplateRegistry::new();
    registry.register(tenant_template(1));
    let mut tenants = InMemoryTenants::new();
    tenants.insert(gci());
    let config = StudioConfig { utc_offset_minutes: 180, ..Default::default() };
    let generator = FlyerGenerator::new(&registry, &tenants, &config);

    let design = generator.generate(&sunday_service(), Uuid::from_u128(USER)).unwrap().unwrap();
    assert_eq!(design.canvas_json.objects[2].text.as_deref(), Some("Jan 5, 2027 @ 12:05 PM"));
}

#[test]
fn invariant_bindings_from_json() {
    let bindings: Bindings = serde_json::from_value(json!({"x": "{{y}}", "y": "Z"})).unwrap();
    let canvas = CanvasDocument::default()
        .with_objects(vec![flyerstudio_core::GraphicObject::text("{{x}}")]);
    assert_eq!(resolve(&canvas, &bindings).objects[0].text.as_deref(), Some("{{y}}"));
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_authoring_always_normalizes() {
    use flyerstudio_core::templates::TemplateUpdate;
    use flyerstudio_core::zones::get_normalize_call_count;

    let draft: TemplateDraft = serde_json::from_value(json!({
        "name": "Hooked",
        "category": "event",
        "width": 800,
        "height": 1000,
        "canvas_json": {"objects": [{"type": "text", "text": "{{event.title}}"}]}
    }))
    .unwrap();

    let mut registry = TemplateRegistry::new();
    let validator = Validator::default();

    // Other tests may normalize concurrently, so only lower bounds hold.
    let before = get_normalize_call_count();
    let template = registry.create(draft, Uuid::from_u128(USER), &validator).unwrap();
    let after_create = get_normalize_call_count();
    assert!(after_create >= before + 1);

    registry
        .update(
            template.id,
            TemplateUpdate { canvas_json: Some(flyer_canvas()), ..Default::default() },
            &validator,
        )
        .unwrap();
    assert!(get_normalize_call_count() >= after_create + 1);
}
