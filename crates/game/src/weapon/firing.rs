use glam::Vec3;

use super::{Intent, WeaponInstance, WeaponState};
use crate::net::RemoteCall;
use crate::owner::NetRole;
use crate::services::{TraceHit, WeaponCtx, WeaponEvent};
use crate::timer::TimerKind;

/// Shortest refire delay; keeps a late tick from rescheduling into the past.
pub const REFIRE_EPSILON: f32 = 1.0e-4;

impl WeaponInstance {
    /// One pass of the fire loop: shoot if possible, otherwise reload or end
    /// the burst, then schedule the next pass.
    pub(super) fn handle_firing(&mut self, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        if owner.role == NetRole::SimulatedProxy {
            log::debug!("{} observers do not run the fire loop", self.id);
            return;
        }

        let cheats = self.cheats(&owner);
        if self.ledger.can_shoot(cheats) && self.can_fire(&owner) {
            if owner.has_view {
                self.simulate_weapon_fire(ctx);
            }
            if owner.locally_controlled {
                self.fire_weapon(ctx);
                self.use_ammo(ctx);
                self.bump_burst_counter();
            }
        } else if self.can_reload(&owner) {
            self.start_reload(false, ctx);
        } else if owner.locally_controlled {
            if self.ledger.current_ammo() == 0 && !self.intent.contains(Intent::REFIRING) {
                if let Some(sound) = self.config.presentation.out_of_ammo_sound.as_deref() {
                    ctx.fx.play_sound(self.id, sound);
                }
                ctx.fx.notify(WeaponEvent::OutOfAmmo { weapon: self.id });
            }
            if self.burst_counter > 0 {
                self.on_burst_finished(ctx);
            }
        } else {
            self.on_burst_finished(ctx);
        }

        if owner.locally_controlled {
            if !owner.is_authority() {
                ctx.outbox.push(RemoteCall::HandleFiring { weapon: self.id });
            }

            if self.ledger.is_clip_empty() && self.can_reload(&owner) {
                self.start_reload(false, ctx);
            }

            let time_between_shots = self.time_between_shots();
            let refiring = self.state == WeaponState::Firing && time_between_shots > 0.0;
            self.intent.set(Intent::REFIRING, refiring);
            if refiring {
                let delay = (time_between_shots + self.timer_adjustment).max(REFIRE_EPSILON);
                self.timers.set(TimerKind::Refire, ctx.now, delay);
                self.timer_adjustment = 0.0;
            }
        }

        self.last_fire_time = Some(ctx.now - self.refire_slack);
        self.refire_slack = 0.0;
    }

    /// Refire tick. With catch-up enabled, lateness shortens the next delay
    /// and the shot is booked at its nominal time so drift never accumulates.
    pub(super) fn handle_refire(&mut self, ctx: &mut WeaponCtx<'_>) {
        let last = self.last_fire_time.unwrap_or(ctx.now);
        let slack = (ctx.now - last - self.time_between_shots()).max(0.0);
        if self.config.allow_automatic_catchup {
            self.timer_adjustment -= slack;
            self.refire_slack = slack;
        }
        self.handle_firing(ctx);
    }

    pub(super) fn on_burst_started(&mut self, ctx: &mut WeaponCtx<'_>) {
        let time_between_shots = self.time_between_shots();
        match self.last_fire_time {
            Some(last) if time_between_shots > 0.0 && last + time_between_shots > ctx.now => {
                let delay = last + time_between_shots - ctx.now;
                self.timers.set(TimerKind::HandleFiring, ctx.now, delay);
            }
            _ => self.handle_firing(ctx),
        }
    }

    pub(super) fn on_burst_finished(&mut self, ctx: &mut WeaponCtx<'_>) {
        self.burst_counter = 0;
        self.stop_simulating_weapon_fire(ctx);
        self.timers.clear(TimerKind::HandleFiring);
        self.timers.clear(TimerKind::Refire);
        self.intent.remove(Intent::REFIRING);
        self.timer_adjustment = 0.0;
        self.refire_slack = 0.0;
        self.strategy.on_burst_finished();
    }

    fn bump_burst_counter(&mut self) {
        // Zero means "not firing" to observers, so skip it on wrap.
        self.burst_counter = self.burst_counter.checked_add(1).unwrap_or(1);
    }

    fn fire_weapon(&mut self, ctx: &mut WeaponCtx<'_>) {
        let id = self.id;
        self.strategy.fire(id, ctx);
    }

    /// Authority side of a client's fire pass. Ammo and the burst counter only
    /// move here when the shot was legal.
    pub fn server_handle_firing(&mut self, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        if !owner.is_authority() {
            return;
        }

        let should_update = self.ledger.can_shoot(self.cheats(&owner)) && self.can_fire(&owner);
        self.handle_firing(ctx);

        if should_update {
            self.use_ammo(ctx);
            self.bump_burst_counter();
        } else {
            log::debug!("{} ignored fire request in {:?}", self.id, self.state);
        }
    }

    pub fn server_notify_hit(
        &mut self,
        impact: &TraceHit,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let (id, state) = (self.id, self.state);
        self.strategy
            .server_notify_hit(id, state, impact, shoot_dir, seed, spread, ctx);
    }

    pub fn server_notify_miss(
        &mut self,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let id = self.id;
        self.strategy.server_notify_miss(id, shoot_dir, seed, spread, ctx);
    }

    pub fn server_fire_projectile(&mut self, origin: Vec3, direction: Vec3, ctx: &mut WeaponCtx<'_>) {
        let id = self.id;
        self.strategy.server_fire_projectile(id, origin, direction, ctx);
    }

    pub(super) fn simulate_weapon_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        if owner.is_authority() && self.state != WeaponState::Firing {
            return;
        }

        let id = self.id;
        let presentation = &self.config.presentation;

        if let Some(effect) = presentation.muzzle_effect.as_deref() {
            if !presentation.looped_muzzle_effect || self.muzzle_effect.is_none() {
                let handle = ctx.fx.spawn_muzzle_effect(id, effect);
                if presentation.looped_muzzle_effect {
                    self.muzzle_effect = handle;
                }
            }
        }

        if let Some(animation) = presentation.fire_animation.as_deref() {
            if !presentation.looped_fire_animation || !self.playing_fire_animation {
                ctx.fx.play_animation(id, animation);
                self.playing_fire_animation = true;
            }
        }

        if presentation.looped_fire_sound {
            if self.fire_sound.is_none() {
                if let Some(sound) = presentation.fire_loop_sound.as_deref() {
                    self.fire_sound = ctx.fx.play_sound(id, sound);
                }
            }
        } else if let Some(sound) = presentation.fire_sound.as_deref() {
            ctx.fx.play_sound(id, sound);
        }

        if owner.locally_controlled {
            ctx.fx.play_fire_feedback(id);
        }
    }

    pub(super) fn stop_simulating_weapon_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        let id = self.id;
        let presentation = &self.config.presentation;

        if let Some(handle) = self.muzzle_effect.take() {
            ctx.fx.stop_effect(handle);
        }

        if self.playing_fire_animation && presentation.looped_fire_animation {
            if let Some(animation) = presentation.fire_animation.as_deref() {
                ctx.fx.stop_animation(id, animation);
            }
        }
        self.playing_fire_animation = false;

        if let Some(handle) = self.fire_sound.take() {
            ctx.fx.stop_sound(handle);
            if let Some(sound) = presentation.fire_finish_sound.as_deref() {
                ctx.fx.play_sound(id, sound);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::handle::{EntityId, WeaponId};
    use crate::owner::OwnerView;
    use crate::testing::{FxCall, Rig, rifle};
    use crate::weapon::WeaponConfig;

    fn equipped(config: WeaponConfig, rig: &mut Rig, owner: OwnerView) -> WeaponInstance {
        let mut weapon = WeaponInstance::new(WeaponId(1), "rifle", config);
        weapon.on_enter_inventory();
        weapon.on_equip(None, &mut rig.ctx(0.0, owner));
        weapon
    }

    fn infinite(owner: OwnerView) -> OwnerView {
        OwnerView {
            infinite_ammo: true,
            ..owner
        }
    }

    /// Holds the trigger from t=0 to `duration`, ticking every 50ms +- `jitter`.
    fn hold_trigger(config: WeaponConfig, duration: f32, jitter: f32, seed: u64) -> u32 {
        let mut rig = Rig::new();
        let owner = infinite(OwnerView::standalone(EntityId(1)));
        let mut weapon = equipped(config, &mut rig, owner);
        let mut rng = StdRng::seed_from_u64(seed);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        let mut now = 0.0_f32;
        while now < duration {
            now = (now + 0.05 + rng.gen_range(-jitter..jitter)).min(duration);
            weapon.tick(&mut rig.ctx(now, owner));
        }
        weapon.burst_counter()
    }

    #[test]
    fn test_refire_pacing_survives_jittered_ticks() {
        for seed in 0..5 {
            let one_second = hold_trigger(rifle(), 1.0, 0.01, seed);
            assert!((4..=6).contains(&one_second), "{one_second} shots in 1s");

            let ten_seconds = hold_trigger(rifle(), 10.0, 0.01, seed);
            assert!((49..=51).contains(&ten_seconds), "{ten_seconds} shots in 10s");
        }
    }

    #[test]
    fn test_refire_pacing_survives_coarse_jitter() {
        for seed in 0..20 {
            let one_second = hold_trigger(rifle(), 1.0, 0.05, seed);
            assert!((5..=6).contains(&one_second), "seed {seed}: {one_second} shots in 1s");

            let one_minute = hold_trigger(rifle(), 60.0, 0.05, seed);
            assert!(
                (299..=301).contains(&one_minute),
                "seed {seed}: {one_minute} shots in 60s"
            );
        }
    }

    #[test]
    fn test_refire_without_catch_up_drifts() {
        let config = WeaponConfig {
            allow_automatic_catchup: false,
            ..rifle()
        };
        let shots = hold_trigger(config, 10.0, 0.01, 3);
        assert!(shots < 49, "{shots} shots without catch-up");
    }

    #[test]
    fn test_late_refire_is_booked_at_nominal_time() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        weapon.tick(&mut rig.ctx(0.27, owner));

        assert_eq!(weapon.burst_counter(), 2);
        let last = weapon.last_fire_time().unwrap();
        assert!((last - 0.2).abs() < 1e-5);
        let next = weapon.timers().due_at(TimerKind::Refire).unwrap();
        assert!((next - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_restarting_a_burst_waits_for_cooldown() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        weapon.stop_fire(&mut rig.ctx(0.05, owner));
        weapon.start_fire(&mut rig.ctx(0.1, owner));
        assert_eq!(weapon.state(), WeaponState::Firing);
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 29);

        weapon.tick(&mut rig.ctx(0.15, owner));
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 29);

        weapon.tick(&mut rig.ctx(0.21, owner));
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 28);
    }

    #[test]
    fn test_empty_clip_reloads_and_resumes_fire() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        let mut now = 0.0_f32;
        while weapon.ledger().current_ammo_in_clip() > 0 && now < 10.0 {
            now += 0.05;
            weapon.tick(&mut rig.ctx(now, owner));
        }

        assert_eq!(weapon.state(), WeaponState::Reloading);
        assert_eq!(weapon.ledger().current_ammo(), 30);
        assert_eq!(weapon.burst_counter(), 0);

        let reload_started = now;
        weapon.tick(&mut rig.ctx(reload_started + 1.45, owner));
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 30);
        assert_eq!(weapon.state(), WeaponState::Reloading);

        weapon.tick(&mut rig.ctx(reload_started + 1.55, owner));
        assert_eq!(weapon.state(), WeaponState::Firing);
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 29);
    }

    #[test]
    fn test_dry_fire_plays_once_per_trigger_pull() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut config = rifle();
        config.ammo.initial_clips = 0;
        let mut weapon = equipped(config, &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        for step in 1..=20 {
            weapon.tick(&mut rig.ctx(step as f32 * 0.05, owner));
        }

        let dry = rig.fx.sounds().iter().filter(|s| **s == "dry_fire").count();
        assert_eq!(dry, 1);
        assert_eq!(weapon.state(), WeaponState::Firing);
        assert_eq!(weapon.burst_counter(), 0);
    }

    #[test]
    fn test_looped_cosmetics_start_once_and_stop_with_tail() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        for step in 1..=5 {
            weapon.tick(&mut rig.ctx(step as f32 * 0.2 + 0.01, owner));
        }
        weapon.stop_fire(&mut rig.ctx(1.05, owner));

        let fx = &rig.fx;
        assert_eq!(fx.count(|c| matches!(c, FxCall::MuzzleEffect(..))), 1);
        assert_eq!(fx.count(|c| matches!(c, FxCall::StopEffect(_))), 1);
        assert_eq!(fx.sounds().iter().filter(|s| **s == "rifle_loop").count(), 1);
        assert_eq!(fx.count(|c| matches!(c, FxCall::StopSound(_))), 1);
        assert_eq!(fx.sounds().last(), Some(&"rifle_tail"));
        assert_eq!(fx.count(|c| matches!(c, FxCall::FireFeedback(_))), 6);
    }

    #[test]
    fn test_observer_mirrors_burst_counter() {
        let mut rig = Rig::new();
        let owner = OwnerView::observer(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.apply_burst_counter(3, &mut rig.ctx(0.0, owner));
        weapon.apply_burst_counter(4, &mut rig.ctx(0.2, owner));
        assert_eq!(rig.fx.count(|c| matches!(c, FxCall::MuzzleEffect(..))), 1);

        weapon.apply_burst_counter(0, &mut rig.ctx(0.4, owner));
        assert_eq!(rig.fx.count(|c| matches!(c, FxCall::StopEffect(_))), 1);
        assert_eq!(rig.fx.count(|c| matches!(c, FxCall::FireFeedback(_))), 0);
        assert_eq!(weapon.state(), WeaponState::Idle);
        assert!(rig.outbox.is_empty());
    }

    #[test]
    fn test_server_ignores_fire_requests_while_reloading() {
        let mut rig = Rig::new();
        let owner = OwnerView::dedicated_server(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.server_handle_firing(&mut rig.ctx(0.0, owner));
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 29);
        assert_eq!(weapon.burst_counter(), 1);

        weapon.start_reload(false, &mut rig.ctx(0.1, owner));
        assert_eq!(weapon.state(), WeaponState::Reloading);

        weapon.server_handle_firing(&mut rig.ctx(0.2, owner));
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 29);
        assert_eq!(weapon.burst_counter(), 0);
    }

    #[test]
    fn test_owning_client_reports_each_pass() {
        let mut rig = Rig::new();
        let owner = OwnerView::owning_client(EntityId(1));
        let mut weapon = equipped(rifle(), &mut rig, owner);

        weapon.start_fire(&mut rig.ctx(0.0, owner));
        weapon.tick(&mut rig.ctx(0.21, owner));

        let calls = rig.outbox.calls();
        assert!(matches!(calls[0], RemoteCall::StartFire { .. }));
        let passes = calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::HandleFiring { .. }))
            .count();
        let reports = calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::NotifyMiss { .. } | RemoteCall::NotifyHit { .. }))
            .count();
        assert_eq!(passes, 2);
        assert_eq!(reports, 2);
        assert_eq!(weapon.ledger().current_ammo_in_clip(), 28);
    }
}
