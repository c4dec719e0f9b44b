use super::{DEFAULT_EQUIP_DURATION, Intent, WeaponInstance, WeaponState, determine_state};
use crate::ammo::AmmoLedger;
use crate::handle::WeaponId;
use crate::hit::HitRecord;
use crate::net::RemoteCall;
use crate::services::{WeaponCtx, WeaponEvent};
use crate::timer::TimerKind;

/// The authority commits reload ammo this long before the animation ends.
const RELOAD_COMMIT_LEAD: f32 = 0.1;
const MIN_RELOAD_COMMIT: f32 = 0.1;
const MAX_TIMER_DISPATCH: usize = 64;

impl WeaponInstance {
    /// Re-derives the state until it settles, then applies the transition.
    pub(super) fn determine_weapon_state(&mut self, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        let mut next = self.state;
        for _ in 0..4 {
            let candidate = determine_state(
                next,
                self.intent,
                self.reload_eligible_in(next, &owner),
                self.fire_eligible_in(next, &owner),
            );
            if candidate == next {
                break;
            }
            next = candidate;
        }
        self.set_weapon_state(next, ctx);
    }

    fn set_weapon_state(&mut self, next: WeaponState, ctx: &mut WeaponCtx<'_>) {
        let previous = self.state;
        if previous == next {
            return;
        }
        log::trace!("{} {previous:?} -> {next:?}", self.id);

        if previous == WeaponState::Firing {
            self.on_burst_finished(ctx);
        }
        self.state = next;
        if next == WeaponState::Firing {
            self.on_burst_started(ctx);
        }
    }

    pub fn start_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        if !ctx.owner.is_authority() {
            ctx.outbox.push(RemoteCall::StartFire { weapon: self.id });
        }

        if !self.intent.contains(Intent::WANTS_TO_FIRE) {
            self.intent.insert(Intent::WANTS_TO_FIRE);
            self.determine_weapon_state(ctx);
        }
    }

    pub fn stop_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        if !owner.is_authority() && owner.locally_controlled {
            ctx.outbox.push(RemoteCall::StopFire { weapon: self.id });
        }

        if self.intent.contains(Intent::WANTS_TO_FIRE) {
            self.intent.remove(Intent::WANTS_TO_FIRE);
            self.determine_weapon_state(ctx);
        }
    }

    /// `from_replication` skips both the eligibility check and the request to
    /// the authority; the authority already decided.
    pub fn start_reload(&mut self, from_replication: bool, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        if !from_replication && !owner.is_authority() {
            ctx.outbox.push(RemoteCall::StartReload { weapon: self.id });
        }

        if !from_replication && !self.can_reload(&owner) {
            return;
        }

        self.intent.insert(Intent::PENDING_RELOAD);
        self.determine_weapon_state(ctx);

        let id = self.id;
        let presentation = &self.config.presentation;
        let played = presentation
            .reload_animation
            .as_deref()
            .map_or(0.0, |animation| ctx.fx.play_animation(id, animation));
        let duration = if played > 0.0 {
            played
        } else {
            self.config.ammo.no_anim_reload_duration
        };

        self.timers.set(TimerKind::StopReload, ctx.now, duration);
        if owner.is_authority() {
            let commit = (duration - RELOAD_COMMIT_LEAD).max(MIN_RELOAD_COMMIT);
            self.timers.set(TimerKind::ReloadWeapon, ctx.now, commit);
        }

        if owner.locally_controlled {
            if let Some(sound) = presentation.reload_sound.as_deref() {
                ctx.fx.play_sound(id, sound);
            }
        }

        ctx.fx.notify(WeaponEvent::ReloadStarted {
            weapon: id,
            duration,
        });
        log::debug!("{id} reloading for {duration:.2}s");
    }

    pub fn stop_reload(&mut self, ctx: &mut WeaponCtx<'_>) {
        if self.state == WeaponState::Reloading {
            self.finish_reload(ctx);
        }
    }

    fn finish_reload(&mut self, ctx: &mut WeaponCtx<'_>) {
        self.intent.remove(Intent::PENDING_RELOAD);
        self.timers.clear(TimerKind::StopReload);
        self.determine_weapon_state(ctx);

        if let Some(animation) = self.config.presentation.reload_animation.as_deref() {
            ctx.fx.stop_animation(self.id, animation);
        }
    }

    fn reload_weapon(&mut self, ctx: &mut WeaponCtx<'_>) {
        let delta = self.ledger.reload(&self.config.ammo, self.cheats(&ctx.owner));
        log::debug!("{} reloaded {delta} rounds", self.id);
        self.notify_ammo(ctx);
    }

    /// Authority only. Returns the rounds actually added.
    pub fn give_ammo(&mut self, amount: u32, is_current: bool, ctx: &mut WeaponCtx<'_>) -> u32 {
        let owner = ctx.owner;
        if !owner.is_authority() {
            log::debug!("{} ignoring ammo grant on non-authority", self.id);
            return 0;
        }

        let added = self.ledger.give(&self.config.ammo, amount);
        if added > 0 {
            self.notify_ammo(ctx);
        }

        if self.ledger.is_clip_empty() && is_current && self.can_reload(&owner) {
            if owner.locally_controlled {
                self.start_reload(false, ctx);
            } else {
                ctx.outbox.push(RemoteCall::ClientStartReload { weapon: self.id });
            }
        }

        self.determine_weapon_state(ctx);
        added
    }

    pub(super) fn use_ammo(&mut self, ctx: &mut WeaponCtx<'_>) {
        self.ledger.consume(&self.config.ammo, self.cheats(&ctx.owner));
        self.notify_ammo(ctx);
    }

    fn notify_ammo(&self, ctx: &mut WeaponCtx<'_>) {
        ctx.fx.notify(WeaponEvent::AmmoChanged {
            weapon: self.id,
            clip: self.ledger.current_ammo_in_clip(),
            total: self.ledger.current_ammo(),
        });
    }

    pub fn on_enter_inventory(&mut self) {
        self.in_inventory = true;
    }

    pub fn on_leave_inventory(&mut self, ctx: &mut WeaponCtx<'_>) {
        if self.attached || self.intent.intersects(Intent::EQUIPPED | Intent::PENDING_EQUIP) {
            self.on_unequip(ctx);
        }
        self.in_inventory = false;
    }

    /// `last` is the weapon being put away; without one the equip is instant.
    pub fn on_equip(&mut self, last: Option<WeaponId>, ctx: &mut WeaponCtx<'_>) {
        if !self.in_inventory {
            log::debug!("{} is not in an inventory, cannot equip", self.id);
            return;
        }

        self.attach(ctx);
        self.intent.insert(Intent::PENDING_EQUIP);
        self.determine_weapon_state(ctx);

        let id = self.id;
        self.equip_started = ctx.now;
        let duration = if last.is_some() {
            let played = self
                .config
                .presentation
                .equip_animation
                .as_deref()
                .map_or(0.0, |animation| ctx.fx.play_animation(id, animation));
            let duration = if played > 0.0 {
                played
            } else {
                DEFAULT_EQUIP_DURATION
            };
            self.equip_duration = duration;
            self.timers.set(TimerKind::EquipFinished, ctx.now, duration);
            duration
        } else {
            self.equip_duration = 0.0;
            self.on_equip_finished(ctx);
            0.0
        };

        if ctx.owner.locally_controlled {
            if let Some(sound) = self.config.presentation.equip_sound.as_deref() {
                ctx.fx.play_sound(id, sound);
            }
        }

        ctx.fx.notify(WeaponEvent::Equipped {
            weapon: id,
            duration,
        });
    }

    pub fn on_equip_finished(&mut self, ctx: &mut WeaponCtx<'_>) {
        self.attach(ctx);
        self.intent.insert(Intent::EQUIPPED);
        self.intent.remove(Intent::PENDING_EQUIP);
        self.determine_weapon_state(ctx);

        let owner = ctx.owner;
        if owner.locally_controlled && self.ledger.is_clip_empty() && self.can_reload(&owner) {
            self.start_reload(false, ctx);
        }
    }

    pub fn on_unequip(&mut self, ctx: &mut WeaponCtx<'_>) {
        self.detach(ctx);
        self.intent.remove(Intent::EQUIPPED);
        self.stop_fire(ctx);

        let id = self.id;
        let presentation = &self.config.presentation;
        if self.intent.contains(Intent::PENDING_RELOAD) {
            if let Some(animation) = presentation.reload_animation.as_deref() {
                ctx.fx.stop_animation(id, animation);
            }
            self.intent.remove(Intent::PENDING_RELOAD);
        }
        if self.intent.contains(Intent::PENDING_EQUIP) {
            if let Some(animation) = presentation.equip_animation.as_deref() {
                ctx.fx.stop_animation(id, animation);
            }
            self.intent.remove(Intent::PENDING_EQUIP);
        }

        self.timers.clear_all();
        self.determine_weapon_state(ctx);
        ctx.fx.notify(WeaponEvent::Unequipped { weapon: id });
    }

    fn attach(&mut self, ctx: &mut WeaponCtx<'_>) {
        if !self.attached {
            self.attached = true;
            ctx.fx.attach_weapon(self.id);
        }
    }

    fn detach(&mut self, ctx: &mut WeaponCtx<'_>) {
        if self.attached {
            self.attached = false;
            ctx.fx.detach_weapon(self.id);
        }
    }

    /// Runs every timer that is due at `ctx.now`.
    pub fn tick(&mut self, ctx: &mut WeaponCtx<'_>) {
        for _ in 0..MAX_TIMER_DISPATCH {
            let Some(kind) = self.timers.pop_due(ctx.now) else {
                return;
            };

            match kind {
                TimerKind::HandleFiring => self.handle_firing(ctx),
                TimerKind::Refire => self.handle_refire(ctx),
                TimerKind::StopReload => self.stop_reload(ctx),
                TimerKind::ReloadWeapon => {
                    if ctx.owner.is_authority() {
                        self.reload_weapon(ctx);
                    }
                }
                TimerKind::EquipFinished => self.on_equip_finished(ctx),
            }
        }
        log::warn!("{} hit the timer dispatch limit in one tick", self.id);
    }

    /// Owner-side reconciliation with the authoritative ammo counts.
    pub fn apply_authoritative_ammo(&mut self, total: u32, clip: u32, ctx: &mut WeaponCtx<'_>) {
        let ledger = AmmoLedger::from_parts(&self.config.ammo, total, clip);
        if ledger == self.ledger {
            return;
        }
        self.ledger = ledger;
        self.notify_ammo(ctx);
        self.determine_weapon_state(ctx);
    }

    pub fn apply_burst_counter(&mut self, value: u32, ctx: &mut WeaponCtx<'_>) {
        self.burst_counter = value;
        if value > 0 {
            self.simulate_weapon_fire(ctx);
        } else {
            self.stop_simulating_weapon_fire(ctx);
        }
    }

    pub fn apply_pending_reload(&mut self, pending: bool, ctx: &mut WeaponCtx<'_>) {
        if pending {
            self.start_reload(true, ctx);
        } else if self.intent.contains(Intent::PENDING_RELOAD) {
            self.finish_reload(ctx);
        }
    }

    pub fn apply_hit_notify(&mut self, record: HitRecord, ctx: &mut WeaponCtx<'_>) {
        let id = self.id;
        self.strategy.simulate_hit(id, record, ctx);
    }
}
