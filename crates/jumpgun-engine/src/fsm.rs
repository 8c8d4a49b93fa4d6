//! Finite-state machine shared by enemy behaviour and the game-mode flow.
//!
//! A [`StateMachine`] owns one boxed [`State`] per kind and keeps exactly one
//! of them active. The owner is passed into every call rather than stored,
//! so the machine can live inside the thing it drives.
//!
//! A transition requested from `execute` is applied after that `execute`
//! returns: the old state's `exit` and the new state's `enter` run, and the
//! new state's `execute` first runs on the *next* call.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FsmError {
    #[error("no state registered for {kind}")]
    UnregisteredState { kind: String },

    #[error("state machine has not been started")]
    NotStarted,
}

/// What `execute` asks the machine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<K> {
    Stay,
    To(K),
}

pub trait State<K, O> {
    fn enter(&mut self, _owner: &mut O) {}

    fn execute(&mut self, owner: &mut O, dt: f32) -> Transition<K>;

    fn exit(&mut self, _owner: &mut O) {}
}

pub struct StateMachine<K, O> {
    states: HashMap<K, Box<dyn State<K, O>>>,
    current: Option<K>,
    transitions: u64,
}

impl<K, O> Default for StateMachine<K, O> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            current: None,
            transitions: 0,
        }
    }
}

impl<K, O> StateMachine<K, O>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the state used for `kind`, replacing any previous one.
    pub fn with_state(mut self, kind: K, state: impl State<K, O> + 'static) -> Self {
        self.states.insert(kind, Box::new(state));
        self
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    pub fn is_in(&self, kind: K) -> bool {
        self.current == Some(kind)
    }

    /// Number of state changes since construction, including the start.
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Enter the initial state.
    pub fn start(&mut self, initial: K, owner: &mut O) -> Result<(), FsmError> {
        self.change_state(initial, owner).map(|_| ())
    }

    /// Switch to `next`. A no-op returning `Ok(false)` if `next` is already
    /// active.
    pub fn change_state(&mut self, next: K, owner: &mut O) -> Result<bool, FsmError> {
        if self.current == Some(next) {
            return Ok(false);
        }
        if !self.states.contains_key(&next) {
            return Err(FsmError::UnregisteredState {
                kind: format!("{next:?}"),
            });
        }
        if let Some(prev) = self.current {
            if let Some(state) = self.states.get_mut(&prev) {
                state.exit(owner);
            }
        }
        debug!(from = ?self.current, to = ?next, "state change");
        self.current = Some(next);
        self.transitions += 1;
        if let Some(state) = self.states.get_mut(&next) {
            state.enter(owner);
        }
        Ok(true)
    }

    /// Run the active state once. Returns the new kind if it requested a
    /// transition.
    pub fn execute(&mut self, owner: &mut O, dt: f32) -> Result<Option<K>, FsmError> {
        let current = self.current.ok_or(FsmError::NotStarted)?;
        let transition = match self.states.get_mut(&current) {
            Some(state) => state.execute(owner, dt),
            None => {
                return Err(FsmError::UnregisteredState {
                    kind: format!("{current:?}"),
                })
            }
        };
        match transition {
            Transition::Stay => Ok(None),
            Transition::To(next) => {
                let changed = self.change_state(next, owner)?;
                Ok(changed.then_some(next))
            }
        }
    }
}

impl<K: Debug, O> Debug for StateMachine<K, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("states", &self.states.len())
            .field("transitions", &self.transitions)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Light {
        Red,
        Green,
    }

    #[derive(Default)]
    struct Junction {
        log: Vec<String>,
        switch_after: u32,
    }

    struct Phase {
        name: &'static str,
        next: Light,
        ticks: u32,
    }

    impl State<Light, Junction> for Phase {
        fn enter(&mut self, owner: &mut Junction) {
            self.ticks = 0;
            owner.log.push(format!("enter:{}", self.name));
        }
        fn execute(&mut self, owner: &mut Junction, _dt: f32) -> Transition<Light> {
            owner.log.push(format!("exec:{}", self.name));
            self.ticks += 1;
            if self.ticks >= owner.switch_after {
                Transition::To(self.next)
            } else {
                Transition::Stay
            }
        }
        fn exit(&mut self, owner: &mut Junction) {
            owner.log.push(format!("exit:{}", self.name));
        }
    }

    fn machine() -> StateMachine<Light, Junction> {
        StateMachine::new()
            .with_state(
                Light::Red,
                Phase {
                    name: "red",
                    next: Light::Green,
                    ticks: 0,
                },
            )
            .with_state(
                Light::Green,
                Phase {
                    name: "green",
                    next: Light::Red,
                    ticks: 0,
                },
            )
    }

    #[test]
    fn change_to_active_state_is_a_no_op() {
        let mut fsm = machine();
        let mut owner = Junction::default();
        fsm.start(Light::Red, &mut owner).unwrap();
        assert_eq!(fsm.change_state(Light::Red, &mut owner), Ok(false));
        assert_eq!(owner.log, vec!["enter:red"]);
        assert_eq!(fsm.transition_count(), 1);
    }

    #[test]
    fn transition_applies_after_execute_and_runs_next_call() {
        let mut fsm = machine();
        let mut owner = Junction {
            switch_after: 1,
            ..Default::default()
        };
        fsm.start(Light::Red, &mut owner).unwrap();
        assert_eq!(fsm.execute(&mut owner, 0.1), Ok(Some(Light::Green)));
        assert_eq!(owner.log, vec!["enter:red", "exec:red", "exit:red", "enter:green"]);
        fsm.execute(&mut owner, 0.1).unwrap();
        assert_eq!(owner.log.last().map(String::as_str), Some("exec:green"));
    }

    #[test]
    fn execute_before_start_fails() {
        let mut fsm = machine();
        let mut owner = Junction::default();
        assert_eq!(fsm.execute(&mut owner, 0.1), Err(FsmError::NotStarted));
    }

    #[test]
    fn unknown_state_is_reported() {
        let mut fsm: StateMachine<Light, Junction> = StateMachine::new();
        let mut owner = Junction::default();
        assert!(matches!(
            fsm.start(Light::Green, &mut owner),
            Err(FsmError::UnregisteredState { .. })
        ));
    }
}
