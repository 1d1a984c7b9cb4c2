/*!
Generic transition-table state machine.

The machine only tracks *which* state is active. State objects live with the owner, which
performs lifecycle calls through a [`StateHost`]. This lets the same machine drive the
character's movement modes and the push/pull phases.

Notes
- Predicates take a read-only view (`&V`) and cannot mutate anything; side effects belong in
  `enter_state` / `exit_state`.
- Any-transitions are checked before the current state's transitions, each list in
  registration order. The first predicate that holds wins.
- A transition takes effect immediately: the new state receives the triggering inputs in the
  same `tick`.
*/

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub type Predicate<V> = Box<dyn Fn(&V) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("state machine ticked before an initial state was set")]
    NotStarted,
}

/// Lifecycle calls the machine makes on the owner's state objects.
pub trait StateHost<K, I> {
    fn enter_state(&mut self, state: K, previous: Option<K>);
    fn exit_state(&mut self, state: K);
    fn tick_state(&mut self, state: K, inputs: &I);
}

struct Transition<K, V> {
    to: K,
    predicate: Predicate<V>,
}

pub struct StateMachine<K, V> {
    current: Option<K>,
    previous: Option<K>,
    transitions: HashMap<K, Vec<Transition<K, V>>>,
    any_transitions: Vec<Transition<K, V>>,
}

impl<K, V> Default for StateMachine<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StateMachine<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            current: None,
            previous: None,
            transitions: HashMap::new(),
            any_transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    pub fn previous(&self) -> Option<K> {
        self.previous
    }

    /// Register `from -> to`, evaluated only while `from` is active.
    pub fn add_transition(&mut self, from: K, to: K, predicate: impl Fn(&V) -> bool + 'static) {
        self.transitions.entry(from).or_default().push(Transition {
            to,
            predicate: Box::new(predicate),
        });
    }

    /// Register a transition evaluated regardless of the active state.
    pub fn add_any_transition(&mut self, to: K, predicate: impl Fn(&V) -> bool + 'static) {
        self.any_transitions.push(Transition {
            to,
            predicate: Box::new(predicate),
        });
    }

    /// Switch to `state`. Returns `false` without side effects when it is already active.
    pub fn set_state<I>(&mut self, state: K, host: &mut impl StateHost<K, I>) -> bool {
        if self.current == Some(state) {
            return false;
        }

        if let Some(current) = self.current {
            host.exit_state(current);
            log::debug!("State {current:?} -> {state:?}");
        }
        self.previous = self.current;
        self.current = Some(state);
        host.enter_state(state, self.previous);
        true
    }

    /// Evaluate transitions, switch if one fires, then forward `inputs` to the active state.
    pub fn tick<I>(
        &mut self,
        view: &V,
        host: &mut impl StateHost<K, I>,
        inputs: &I,
    ) -> Result<(), StateMachineError> {
        let Some(current) = self.current else {
            log::error!("State machine ticked before an initial state was set");
            return Err(StateMachineError::NotStarted);
        };

        if let Some(next) = self.next_transition(current, view) {
            self.set_state(next, host);
        }

        if let Some(active) = self.current {
            host.tick_state(active, inputs);
        }
        Ok(())
    }

    fn next_transition(&self, current: K, view: &V) -> Option<K> {
        let scoped = self.transitions.get(&current).map(Vec::as_slice).unwrap_or(&[]);
        self.any_transitions
            .iter()
            .chain(scoped)
            .find(|transition| (transition.predicate)(view))
            .map(|transition| transition.to)
    }
}
