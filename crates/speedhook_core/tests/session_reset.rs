use speedhook_core::host::memory::{SimulatedGame, SimulatedTimeManager, SET_TIME_SCALE};
use speedhook_core::{
    Color, DomainOwner, ExtensionConfig, ExtensionContext, GateResetPolicy, TriggerId, TriggerMapper,
};
use std::collections::BTreeSet;

const LABEL: &str = "Game Speed Text";

fn tick(value: &str) -> BTreeSet<TriggerId> {
    BTreeSet::from([TriggerId::new(value)])
}

#[test]
fn default_policy_keeps_gate_closed() {
    let mut ctx =
        ExtensionContext::new(ExtensionConfig::game_speed()).expect("preset config is valid");
    let mut game = SimulatedGame::in_session(LABEL);
    TriggerMapper::new().on_tick(&mut ctx, &mut game, &tick("Alpha5"));

    assert!(!ctx.on_session_change(&mut game));
    assert!(ctx.is_extended());
    let manager = game.time_manager().expect("session loaded");
    assert_eq!(manager.object().hook_count(SET_TIME_SCALE), 1);
}

#[test]
fn session_change_policy_releases_and_reextends() {
    let mut config = ExtensionConfig::game_speed();
    config.gate_reset = GateResetPolicy::OnSessionChange;
    let mut ctx = ExtensionContext::new(config).expect("config is valid");
    let mut game = SimulatedGame::in_session(LABEL);
    let label = game.label(LABEL).expect("label in scene");
    let mapper = TriggerMapper::new();

    mapper.on_tick(&mut ctx, &mut game, &tick("Alpha0"));
    assert_eq!(label.borrow().color, Color::rgb(255, 77, 0));

    assert!(ctx.on_session_change(&mut game));
    assert!(!ctx.is_extended());
    assert_eq!(label.borrow().color, Color::WHITE);
    assert!(ctx.installed_hooks().is_empty());
    assert_eq!(ctx.interceptor().hooked_count(), 0);
    let manager = game.time_manager().expect("session loaded");
    assert_eq!(manager.object().hook_count(SET_TIME_SCALE), 0);

    game.unload_session();
    game.load_session(SimulatedTimeManager::stock());
    mapper.on_tick(&mut ctx, &mut game, &tick("Alpha0"));
    assert!(ctx.is_extended());
    assert_eq!(ctx.stats().merge_writes, 2);
    let manager = game.time_manager().expect("session loaded");
    assert_eq!(manager.active_value(), Some(50.0));
    assert_eq!(manager.object().hook_count(SET_TIME_SCALE), 1);
}

#[test]
fn session_change_before_extension_is_noop() {
    let mut config = ExtensionConfig::game_speed();
    config.gate_reset = GateResetPolicy::OnSessionChange;
    let mut ctx = ExtensionContext::new(config).expect("config is valid");
    let mut game = SimulatedGame::booting();

    assert!(!ctx.on_session_change(&mut game));
    assert_eq!(ctx.stats().ensure_calls, 0);
}
