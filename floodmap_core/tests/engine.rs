// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end engine behaviour against the scripted renderer.

use std::cell::RefCell;
use std::rc::Rc;

use floodmap_core::config::EngineConfig;
use floodmap_core::engine::FloodMap;
use floodmap_core::level::{FloodLevel, LayerKey, ScenarioMode, TileIndex};
use floodmap_core::lifecycle::{LayerStatus, Phase};
use floodmap_core::renderer::{Cursor, MapEvent, Renderer};
use floodmap_core::tileset::{TilesetEntry, TilesetRegistry};
use floodmap_harness::{
    ScriptedRenderer, depth_feature, emit, finish_style_load, hover, leave, settle,
};
use serde_json::json;

fn engine(renderer: ScriptedRenderer) -> FloodMap<ScriptedRenderer> {
    FloodMap::new(renderer, TilesetRegistry::builtin(), EngineConfig::new())
}

fn scene(engine: &FloodMap<ScriptedRenderer>) -> &ScriptedRenderer {
    engine.renderer().expect("renderer alive")
}

fn scene_mut(engine: &mut FloodMap<ScriptedRenderer>) -> &mut ScriptedRenderer {
    engine.renderer_mut().expect("renderer alive")
}

/// Published layers in the stock registry: 13 base + 5 barrier.
const BUILTIN_LAYERS: usize = 18;

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

#[test]
fn first_activation_waits_for_style() {
    let mut map = engine(ScriptedRenderer::loading());
    assert_eq!(map.phase(), Phase::Uninitialized);
    map.refresh();
    assert_eq!(map.phase(), Phase::Initializing);
    assert!(map.is_loading());
    assert_eq!(scene(&map).layer_count(), 0, "nothing added before style");
    assert_eq!(scene(&map).listener_count(), 1);

    assert_eq!(finish_style_load(&mut map), 1);
    assert_eq!(map.phase(), Phase::Ready);
    assert_eq!(scene(&map).layer_count(), BUILTIN_LAYERS);
    assert_eq!(scene(&map).visible_layers(), ["flood70-fill"]);
    assert!(map.is_loading(), "hover rebind still waits for idle");
    assert_eq!(map.hover_layer(), None);

    assert_eq!(settle(&mut map), 1);
    assert!(!map.is_loading());
    assert_eq!(scene(&map).hover_layers(), ["flood70-fill"]);
}

#[test]
fn first_styledata_runs_the_parked_activation() {
    let mut map = engine(ScriptedRenderer::loading());
    map.refresh();
    assert_eq!(emit(&mut map, MapEvent::StyleData), 1);
    assert!(
        !scene(&map).is_style_loaded(),
        "tiles are still loading on the renderer"
    );
    assert_eq!(map.phase(), Phase::Ready);
    assert_eq!(scene(&map).layer_count(), BUILTIN_LAYERS);
    assert_eq!(scene(&map).visible_layers(), ["flood70-fill"]);
    assert_eq!(scene(&map).listener_count(), 1, "only the idle waiter");

    assert_eq!(settle(&mut map), 1);
    assert!(!map.is_loading());
    assert_eq!(map.hover_layer().map(|l| l.layer_id()), Some("flood70-fill"));
}

#[test]
fn selections_during_style_load_run_only_the_latest() {
    let mut map = engine(ScriptedRenderer::loading());
    map.select_level(16);
    map.toggle_scenario_mode();
    map.select_level(15);
    assert_eq!(scene(&map).listener_count(), 1, "one shared gate waiter");

    finish_style_load(&mut map);
    assert_eq!(scene(&map).visible_layers(), ["hesco71-fill"]);
    assert_eq!(scene(&map).layer_adds(), BUILTIN_LAYERS, "one batch only");
}

// ---------------------------------------------------------------------------
// Visibility properties
// ---------------------------------------------------------------------------

#[test]
fn at_most_one_layer_visible_for_every_selection() {
    let mut map = engine(ScriptedRenderer::ready());
    let registry = TilesetRegistry::builtin();
    for n in 1..=18 {
        for mode in ScenarioMode::ALL {
            map.select_level(n);
            map.set_scenario_mode(mode);
            settle(&mut map);

            let level = FloodLevel::clamped(n);
            let expected = LayerKey::new(map.scenario_mode(), level.tile_index());
            let visible = scene(&map).visible_keys();
            assert!(visible.len() <= 1, "level {n} {mode:?}: {visible:?}");
            if registry.contains(expected) {
                assert_eq!(visible, [expected], "level {n} {mode:?}");
                assert_eq!(map.active_layer().map(|a| a.key()), Some(expected));
            } else {
                assert!(visible.is_empty(), "level {n} {mode:?}: {visible:?}");
                assert_eq!(map.active_layer(), None);
            }
            assert!(!map.is_loading(), "level {n} {mode:?} settled");
        }
    }
    assert_eq!(scene(&map).layer_adds(), BUILTIN_LAYERS, "layers never rebuilt");
}

#[test]
fn barrier_is_forced_off_outside_its_range() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    assert_eq!(map.toggle_scenario_mode(), ScenarioMode::Barrier);
    map.select_level(10);
    assert_eq!(map.scenario_mode(), ScenarioMode::Base);
    for n in 1..14 {
        map.select_level(n);
        assert_eq!(map.toggle_scenario_mode(), ScenarioMode::Base, "level {n}");
        settle(&mut map);
        assert_eq!(map.scenario_mode(), ScenarioMode::Base, "level {n}");
    }
}

#[test]
fn ensure_layer_is_idempotent() {
    let mut map = engine(ScriptedRenderer::ready());
    let first = map.ensure_layer(ScenarioMode::Base, TileIndex(72));
    let second = map.ensure_layer(ScenarioMode::Base, TileIndex(72));
    assert_eq!(first, second);
    assert!(matches!(first, LayerStatus::Ready(_)));
    assert_eq!(scene(&map).source_adds(), 1);
    assert_eq!(scene(&map).layer_adds(), 1);
    let layer = scene(&map).layer("flood72-fill").expect("layer created");
    assert_eq!(layer.visibility, floodmap_core::renderer::Visibility::None);
    assert!((layer.opacity - 0.6).abs() < f32::EPSILON);
    assert_eq!(
        scene(&map).source_url("flood72"),
        Some("mapbox://floodmap.flood72-9a6e3m")
    );
}

#[test]
fn missing_tileset_is_unavailable_not_an_error() {
    let mut map = engine(ScriptedRenderer::ready());
    assert_eq!(
        map.ensure_layer(ScenarioMode::Barrier, TileIndex(65)),
        LayerStatus::Unavailable
    );
    assert_eq!(scene(&map).layer_count(), 0);
}

// ---------------------------------------------------------------------------
// Hover
// ---------------------------------------------------------------------------

#[test]
fn tile_73_shows_depth_tooltip() {
    let mut map = engine(ScriptedRenderer::ready());
    map.activate_tile(ScenarioMode::Base, TileIndex(73));
    settle(&mut map);
    assert_eq!(scene(&map).visible_layers(), ["flood73-fill"]);

    scene_mut(&mut map).place_feature("flood73-fill", depth_feature(json!(3.2)));
    assert_eq!(hover(&mut map), 1);
    assert_eq!(scene(&map).popup_text(), Some("Water Depth: 3.2 ft"));
    assert_eq!(scene(&map).cursor(), Cursor::Pointer);

    assert_eq!(leave(&mut map), 1);
    assert_eq!(scene(&map).popup_text(), None);
    assert_eq!(scene(&map).cursor(), Cursor::Default);
}

#[test]
fn non_numeric_depth_reads_unknown() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);
    scene_mut(&mut map).place_feature("flood72-fill", depth_feature(json!("n/a")));
    hover(&mut map);
    assert_eq!(scene(&map).popup_text(), Some("Water Depth: Unknown"));
}

#[test]
fn pointer_off_features_hides_tooltip() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);
    scene_mut(&mut map).place_feature("flood72-fill", depth_feature(json!(1.0)));
    hover(&mut map);
    assert!(scene(&map).popup_text().is_some());

    scene_mut(&mut map).clear_features();
    hover(&mut map);
    assert_eq!(scene(&map).popup_text(), None);
    assert_eq!(scene(&map).cursor(), Cursor::Default);
}

#[test]
fn tile_82_settles_with_nothing_visible() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);

    map.activate_tile(ScenarioMode::Base, TileIndex(82));
    assert!(map.is_loading());
    settle(&mut map);
    assert!(scene(&map).visible_layers().is_empty());
    assert!(!map.is_loading());
    assert_eq!(map.active_layer(), None);
    assert_eq!(map.hover_layer(), None);
    assert_eq!(scene(&map).listener_count(), 0, "hover binds nothing");
}

#[test]
fn rapid_activations_leave_one_binding() {
    let mut map = engine(ScriptedRenderer::ready());
    for n in [14, 18, 15, 17, 16] {
        map.select_level(n);
    }
    assert_eq!(scene(&map).listener_count(), 1, "only the newest idle waiter");
    settle(&mut map);
    assert_eq!(scene(&map).hover_layers(), ["flood72-fill"]);
    assert_eq!(scene(&map).listener_count(), 2);

    for n in [14, 18, 15, 17] {
        map.select_level(n);
        settle(&mut map);
        assert_eq!(map.listener_count(), 2, "level {n}");
        assert_eq!(scene(&map).listener_count(), 2, "level {n}");
    }
    assert_eq!(scene(&map).hover_layers(), ["flood73-fill"]);
}

#[test]
fn mode_switch_mid_flight_binds_the_latest_layer() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    map.set_scenario_mode(ScenarioMode::Barrier);
    settle(&mut map);
    assert_eq!(scene(&map).hover_layers(), ["hesco72-fill"]);

    map.select_level(16);
    map.set_scenario_mode(ScenarioMode::Barrier);
    map.toggle_scenario_mode();
    settle(&mut map);

    assert_eq!(scene(&map).visible_layers(), ["flood72-fill"]);
    assert_eq!(scene(&map).hover_layers(), ["flood72-fill"]);
    assert_eq!(scene(&map).layer_listener_count("hesco72-fill"), 0);
    assert!(!map.is_loading());
}

#[test]
fn tooltip_popup_is_reused_across_rebinds() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);
    scene_mut(&mut map).place_feature("flood72-fill", depth_feature(json!(2.0)));
    scene_mut(&mut map).place_feature("hesco72-fill", depth_feature(json!(0.4)));
    hover(&mut map);

    map.toggle_scenario_mode();
    settle(&mut map);
    assert_eq!(scene(&map).popup_text(), None, "rebind clears the tooltip");
    hover(&mut map);
    assert_eq!(scene(&map).popup_text(), Some("Water Depth: 0.4 ft"));
    assert_eq!(scene(&map).popups_created(), 1);
}

// ---------------------------------------------------------------------------
// Observers, registry, menu
// ---------------------------------------------------------------------------

#[test]
fn observers_hear_each_change_once() {
    let mut map = engine(ScriptedRenderer::ready());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    map.on_active_change(move |layer| {
        sink.borrow_mut()
            .push(layer.map(|l| l.layer_id().to_owned()));
    });

    map.select_level(16);
    map.select_level(16);
    map.select_level(3);
    map.select_level(17);
    assert_eq!(
        *seen.borrow(),
        [
            Some(String::from("flood72-fill")),
            None,
            Some(String::from("flood73-fill")),
        ]
    );
}

#[test]
fn replacing_the_registry_purges_changed_layers() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);

    let mut registry = TilesetRegistry::builtin();
    registry.insert(
        ScenarioMode::Base,
        TileIndex(72),
        TilesetEntry::new("floodmap.flood72-rev2", "flood72"),
    );
    registry.remove(ScenarioMode::Barrier, TileIndex(74));
    assert_eq!(map.replace_registry(registry), 2);

    assert_eq!(scene(&map).layer_count(), BUILTIN_LAYERS - 1);
    assert_eq!(
        scene(&map).source_url("flood72"),
        Some("mapbox://floodmap.flood72-rev2")
    );
    assert!(scene(&map).layer("hesco74-fill").is_none());
    settle(&mut map);
    assert_eq!(scene(&map).hover_layers(), ["flood72-fill"]);
}

#[test]
fn changing_only_the_source_layer_rebuilds_the_layer() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);

    let mut registry = TilesetRegistry::builtin();
    let key = LayerKey::new(ScenarioMode::Base, TileIndex(72));
    let tileset = registry.get(key).expect("builtin flood72").tileset.clone();
    registry.insert(
        ScenarioMode::Base,
        TileIndex(72),
        TilesetEntry::new(tileset, "flood72_v2"),
    );
    assert_eq!(map.replace_registry(registry), 1);

    let layer = scene(&map).layer("flood72-fill").expect("layer rebuilt");
    assert_eq!(layer.source_layer, "flood72_v2");
    assert_eq!(scene(&map).visible_layers(), ["flood72-fill"]);
}

#[test]
fn menu_changes_do_no_layer_work() {
    let mut map = engine(ScriptedRenderer::ready());
    let generation = map.generation();
    assert!(map.toggle_menu());
    map.set_menu_open(false);
    assert!(!map.menu_open());
    assert_eq!(map.generation(), generation);
    assert_eq!(scene(&map).layer_count(), 0);
}

#[test]
fn rejected_layers_still_settle() {
    let mut renderer = ScriptedRenderer::ready();
    renderer.reject_layers(true);
    let mut map = engine(renderer);
    map.select_level(16);
    settle(&mut map);
    assert!(scene(&map).visible_layers().is_empty());
    assert!(!map.is_loading());
    assert_eq!(map.hover_layer(), None);
}

#[test]
fn rejected_layer_leaves_no_orphaned_source() {
    let mut renderer = ScriptedRenderer::ready();
    renderer.reject_layers(true);
    let mut map = engine(renderer);
    map.select_level(16);
    settle(&mut map);
    assert_eq!(
        scene(&map).source_count(),
        0,
        "sources of rejected layers are removed"
    );

    scene_mut(&mut map).reject_layers(false);
    let mut registry = TilesetRegistry::builtin();
    registry.insert(
        ScenarioMode::Base,
        TileIndex(72),
        TilesetEntry::new("floodmap.flood72-rev2", "flood72"),
    );
    map.replace_registry(registry);
    assert_eq!(
        scene(&map).source_url("flood72"),
        Some("mapbox://floodmap.flood72-rev2"),
        "the rebuilt layer uses the new tileset"
    );
    assert_eq!(scene(&map).visible_layers(), ["flood72-fill"]);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn teardown_removes_every_listener_and_destroys_once() {
    let mut map = engine(ScriptedRenderer::ready());
    map.select_level(16);
    settle(&mut map);
    map.select_level(17);

    let renderer = map.teardown().expect("first teardown returns the renderer");
    assert_eq!(renderer.destroy_count(), 1);
    assert_eq!(renderer.listener_count(), 0);
    assert!(map.teardown().is_none(), "teardown is idempotent");
    assert_eq!(map.phase(), Phase::Disposed);
    assert!(!map.is_loading());
    assert_eq!(map.listener_count(), 0);
}

#[test]
fn teardown_while_style_loads_cancels_the_gate() {
    let mut map = engine(ScriptedRenderer::loading());
    map.refresh();
    let renderer = map.teardown().expect("renderer");
    assert_eq!(renderer.listener_count(), 0);
    assert_eq!(renderer.layer_count(), 0);
}

#[test]
fn operations_after_teardown_are_no_ops() {
    let mut map = engine(ScriptedRenderer::ready());
    let _ = map.teardown();
    assert_eq!(map.select_level(16).get(), 16);
    assert!(!map.is_loading());
    assert_eq!(emit(&mut map, MapEvent::Idle), 0);
    assert_eq!(
        map.ensure_layer(ScenarioMode::Base, TileIndex(72)),
        LayerStatus::Unavailable
    );
}
