//! Timed runtime-control events replayed alongside the camera path.

use tracing::{info, warn};
use vitalis_animation::{ConditionId, ConditionKind, ConditionSpec, Severity};
use vitalis_geometry::BodySystem;
use vitalis_scene::{ReadingLevel, SceneCoordinator};

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptAction {
    HideSystem(BodySystem),
    ShowSystem(BodySystem),
    Select(&'static str),
    ClearSelection,
    AddCondition {
        kind: ConditionKind,
        severity: Severity,
        structure: &'static str,
    },
    ClearConditions,
    Pause,
    Play,
    SetSpeed(f32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptEvent {
    pub time: f32,
    pub action: ScriptAction,
}

impl ScriptEvent {
    pub fn at(time: f32, action: ScriptAction) -> Self {
        Self { time, action }
    }
}

/// Events in time order with a cursor. Rewind when the tour loops.
#[derive(Clone, Debug)]
pub struct Script {
    events: Vec<ScriptEvent>,
    next: usize,
}

impl Script {
    pub fn new(mut events: Vec<ScriptEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { events, next: 0 }
    }

    /// Pairs with [`CameraDolly::tour`](crate::dolly::CameraDolly::tour).
    pub fn tour() -> Self {
        use ScriptAction::*;
        Self::new(vec![
            ScriptEvent::at(0.0, HideSystem(BodySystem::Integumentary)),
            ScriptEvent::at(6.0, Select("heart")),
            ScriptEvent::at(
                7.0,
                AddCondition {
                    kind: ConditionKind::Arrhythmia,
                    severity: Severity::Moderate,
                    structure: "heart",
                },
            ),
            ScriptEvent::at(
                14.0,
                AddCondition {
                    kind: ConditionKind::RespiratoryRestriction,
                    severity: Severity::Severe,
                    structure: "left_lung",
                },
            ),
            ScriptEvent::at(19.0, ClearConditions),
            ScriptEvent::at(19.0, ClearSelection),
            ScriptEvent::at(22.0, Select("brain")),
            ScriptEvent::at(26.0, Select("liver")),
            ScriptEvent::at(
                26.0,
                AddCondition {
                    kind: ConditionKind::Inflammation,
                    severity: Severity::Mild,
                    structure: "liver",
                },
            ),
            ScriptEvent::at(30.0, Pause),
            ScriptEvent::at(32.0, Play),
            ScriptEvent::at(32.0, SetSpeed(0.5)),
            ScriptEvent::at(36.0, SetSpeed(1.0)),
            ScriptEvent::at(36.0, ClearConditions),
            ScriptEvent::at(36.0, ClearSelection),
            ScriptEvent::at(39.0, ShowSystem(BodySystem::Integumentary)),
        ])
    }

    /// Events whose time has come since the last call.
    pub fn due(&mut self, time: f32) -> &[ScriptEvent] {
        let start = self.next;
        while self.next < self.events.len() && self.events[self.next].time <= time {
            self.next += 1;
        }
        &self.events[start..self.next]
    }

    pub fn rewind(&mut self) {
        self.next = 0;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Apply one action. `conditions` tracks overlays the script added.
pub fn apply(scene: &mut SceneCoordinator, action: &ScriptAction, conditions: &mut Vec<ConditionId>) {
    match *action {
        ScriptAction::HideSystem(system) => scene.set_system_visible(system, false),
        ScriptAction::ShowSystem(system) => scene.set_system_visible(system, true),
        ScriptAction::Select(name) => {
            if scene.select_by_name(name).is_none() {
                warn!("Script selects unknown structure {name}");
                return;
            }
            if let Some(content) = scene.selected_content(ReadingLevel::PATIENT) {
                info!("{}: {}", content.title, content.summary);
            }
        }
        ScriptAction::ClearSelection => scene.clear_selection(),
        ScriptAction::AddCondition {
            kind,
            severity,
            structure,
        } => {
            let Some(target) = scene.registry().by_name(structure) else {
                warn!("Script adds {} to unknown structure {structure}", kind.name());
                return;
            };
            let spec = ConditionSpec::new(kind, severity, target.bounds.center, target.bounds.radius)
                .on_structure(target.id);
            conditions.push(scene.add_condition(spec));
        }
        ScriptAction::ClearConditions => {
            for id in conditions.drain(..) {
                scene.remove_condition(id);
            }
        }
        ScriptAction::Pause => scene.pause(),
        ScriptAction::Play => scene.play(),
        ScriptAction::SetSpeed(speed) => scene.set_speed(speed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_advances_once() {
        let mut script = Script::new(vec![
            ScriptEvent::at(2.0, ScriptAction::Play),
            ScriptEvent::at(1.0, ScriptAction::Pause),
        ]);
        assert!(script.due(0.5).is_empty());
        assert_eq!(script.due(1.0), &[ScriptEvent::at(1.0, ScriptAction::Pause)]);
        assert!(script.due(1.5).is_empty());
        assert_eq!(script.due(10.0).len(), 1);
        assert!(script.due(20.0).is_empty());

        script.rewind();
        assert_eq!(script.due(10.0).len(), 2);
    }

    /// The tour only names structures the built-in anatomy has.
    #[test]
    fn test_tour_names_exist() {
        let registry = crate::anatomy::default_registry().unwrap();
        let mut script = Script::tour();
        assert!(!script.is_empty());
        for event in script.due(f32::MAX) {
            match event.action {
                ScriptAction::Select(name) | ScriptAction::AddCondition { structure: name, .. } => {
                    assert!(registry.by_name(name).is_some(), "{name}");
                }
                _ => {}
            }
        }
    }
}
