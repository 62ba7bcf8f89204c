//! Replay utilities

use rotation_core::types::EPSILON;
use rotation_core::{ActionNode, DamageSummary, RealTimeDriver, Session, SimReport};
use std::thread;
use std::time::Duration;

/// Outcome of running a record to its end
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub damage: DamageSummary,
    /// Display time of the first applied hit
    pub first_hit: Option<f64>,
    pub end_time: f64,
    pub reports: Vec<SimReport>,
}

impl ReplaySummary {
    /// Collect the summary of a session that has finished replaying
    pub fn from_session(session: &mut Session) -> Self {
        let reports = session.drain_reports();
        let first_hit = reports.iter().find_map(|r| match r {
            SimReport::DamageApplied { time, .. } => Some(*time),
            _ => None,
        });
        ReplaySummary {
            damage: session.damage_summary(),
            first_hit,
            end_time: session.engine().display_time(),
            reports,
        }
    }

    /// Applied damage per second from the first hit to the end of the record
    pub fn dps(&self) -> f64 {
        match (self.first_hit, self.damage.last_application_time) {
            (Some(first), Some(last)) => self.damage.dps(last.max(self.end_time) - first),
            _ => 0.0,
        }
    }
}

/// Play a record against the wall clock
///
/// Waits are fed through the driver in frames of `frame` real time, so a
/// time scale of 1.0 takes as long as the rotation itself. `on_report`
/// sees every reported event as it happens.
pub fn replay_realtime(
    session: &mut Session,
    actions: &[ActionNode],
    driver: &mut RealTimeDriver,
    frame: Duration,
    mut on_report: impl FnMut(&SimReport),
) -> Result<(), crate::error::CliError> {
    let scale = driver.time_scale().max(f64::EPSILON);
    for action in actions {
        match action {
            ActionNode::Skill { skill } => {
                let availability = session.request_skill(skill)?;
                if !availability.is_ready() {
                    tracing::warn!(skill = %skill, status = %availability.status, "skipping action");
                }
            }
            ActionNode::ToggleResource { resource } => {
                session.toggle_resource(resource)?;
            }
            ActionNode::Wait { duration } => {
                wait_realtime(session, *duration, driver, frame, scale, &mut on_report)?;
            }
            ActionNode::JumpToTimestamp { target_time } => {
                let duration = target_time - session.engine().display_time();
                if duration < 0.0 {
                    session.jump_to_timestamp(*target_time)?;
                } else {
                    wait_realtime(session, duration, driver, frame, scale, &mut on_report)?;
                }
            }
            ActionNode::WaitForMana => {
                let duration = session.engine().time_till_next_mana_tick().unwrap_or(0.0);
                wait_realtime(session, duration, driver, frame, scale, &mut on_report)?;
            }
        }
        for report in session.drain_reports() {
            on_report(&report);
        }
    }
    Ok(())
}

fn wait_realtime(
    session: &mut Session,
    duration: f64,
    driver: &mut RealTimeDriver,
    frame: Duration,
    scale: f64,
    on_report: &mut impl FnMut(&SimReport),
) -> Result<(), crate::error::CliError> {
    let mut remaining = duration;
    while remaining > EPSILON {
        let real = frame.min(Duration::from_secs_f64(remaining / scale));
        if real.is_zero() {
            session.tick(remaining)?;
            break;
        }
        thread::sleep(real);
        remaining -= driver.frame(real, session)?;
        for report in session.drain_reports() {
            on_report(&report);
        }
    }
    Ok(())
}

/// One-line rendering of a reported event
pub fn describe(report: &SimReport) -> String {
    match report {
        SimReport::DamageApplied { time, skill, potency, .. } => {
            format!("{:>8.3}  {:<20} {:>8.1}", time, skill.name, potency)
        }
        SimReport::ResourceTick { time, resource, amount } => {
            format!("{:>8.3}  {:<20} +{:.0}", time, resource.name, amount)
        }
        SimReport::DotTick { time, resource, potency, .. } => {
            format!("{:>8.3}  {:<20} {:>8.1}", time, format!("{} (tick)", resource.name), potency)
        }
        SimReport::DotApplied { time, resource, gap } => match gap {
            Some(gap) => format!("{:>8.3}  {} applied after a {:.2}s gap", time, resource.name, gap),
            None => format!("{:>8.3}  {} applied", time, resource.name),
        },
        SimReport::DotDropped { time, resource } => {
            format!("{:>8.3}  {} dropped", time, resource.name)
        }
        SimReport::Interrupted { time, skill, reason, .. } => {
            format!("{:>8.3}  {} interrupted: {}", time, skill.name, reason)
        }
        SimReport::PastTargetTime { time, target_time, .. } => {
            format!("{:>8.3}  jump to {:.3} is in the past", time, target_time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::{JobCatalog, SessionConfig};
    use std::sync::Arc;

    fn session() -> Session {
        let catalog = Arc::new(JobCatalog::demo().unwrap());
        Session::new(catalog, "demo", SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_summary_counts_hits() {
        let mut s = session();
        s.request_skill("lunge").unwrap();
        s.tick(3.0).unwrap();
        s.request_skill("lunge").unwrap();
        s.tick(3.0).unwrap();

        let summary = ReplaySummary::from_session(&mut s);
        assert_eq!(summary.damage.by_skill["lunge"].hits, 2);
        assert!(summary.first_hit.is_some());
        assert!(summary.dps() > 0.0);
    }

    #[test]
    fn test_realtime_replay_matches_exact() {
        let actions = vec![
            ActionNode::skill("lunge"),
            ActionNode::wait(0.8),
            ActionNode::skill("double_tap"),
            ActionNode::wait(1.0),
        ];
        let mut s = session();
        let mut driver = RealTimeDriver::new(100.0);
        let mut hits = 0;
        replay_realtime(&mut s, &actions, &mut driver, Duration::from_millis(2), |r| {
            if matches!(r, SimReport::DamageApplied { .. }) {
                hits += 1;
            }
        })
        .unwrap();
        assert_eq!(hits, 2);
        assert!((s.engine().time() - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_describe_dot_drop() {
        let report = SimReport::DotDropped {
            time: 12.0,
            resource: rotation_core::ResourceKey::job("demo", "burn"),
        };
        assert_eq!(describe(&report), "  12.000  burn dropped");
    }
}
