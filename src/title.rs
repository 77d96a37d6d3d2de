use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{AllocatorError, Error, ValidationError};
use crate::store::AllocatorStore;

pub const DEFAULT_PREFIX: &str = "Video";

/// Upper bound on compare-and-swap attempts before giving up.
const MAX_SWAP_ATTEMPTS: usize = 8;

/// Persisted numbering state used to synthesize sequential titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatorState {
    pub prefix: String,
    pub counter: u64,
}

impl Default for AllocatorState {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            counter: 0,
        }
    }
}

impl AllocatorState {
    pub fn next_title(&self, rule: TitleRule) -> String {
        rule.render(&self.prefix, self.counter + 1)
    }
}

/// How a prefix and a number combine into a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleRule {
    /// `"<prefix> <number>"`, e.g. `Video 6`.
    #[default]
    Spaced,
    /// `"<prefix><number>"`, e.g. `Video6`.
    Suffixed,
}

impl TitleRule {
    pub fn render(&self, prefix: &str, number: u64) -> String {
        match self {
            TitleRule::Spaced => format!("{prefix} {number}"),
            TitleRule::Suffixed => format!("{prefix}{number}"),
        }
    }
}

/// Outcome of running a candidate title through the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub title: String,
    pub advanced: bool,
}

/// Suggests sequential titles and advances the counter when the operator
/// accepts the suggestion.
///
/// All mutation goes through [AllocatorStore::compare_and_swap], so two
/// concurrent accepts of the same suggestion can never both advance.
pub struct TitleAllocator<S> {
    store: Arc<S>,
    rule: TitleRule,
}

impl<S> Clone for TitleAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            rule: self.rule,
        }
    }
}

impl<S: AllocatorStore> TitleAllocator<S> {
    pub fn new(store: Arc<S>, rule: TitleRule) -> Self {
        Self { store, rule }
    }

    pub fn rule(&self) -> TitleRule {
        self.rule
    }

    pub fn state(&self) -> Result<AllocatorState, AllocatorError> {
        Ok(self.store.load()?)
    }

    /// The title an operator would get by accepting the default.
    pub fn suggest(&self) -> Result<String, AllocatorError> {
        Ok(self.store.load()?.next_title(self.rule))
    }

    #[instrument(skip(self))]
    pub fn suggest_and_maybe_advance(&self, candidate: &str) -> Result<Allocation, AllocatorError> {
        let trimmed = candidate.trim();

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let current = self.store.load()?;
            let expected = current.next_title(self.rule);

            if trimmed != expected {
                return Ok(Allocation {
                    title: candidate.to_string(),
                    advanced: false,
                });
            }

            let next = AllocatorState {
                prefix: current.prefix.clone(),
                counter: current.counter + 1,
            };

            if self.store.compare_and_swap(&current, &next)? {
                info!(counter = next.counter, title = %expected, "advanced title counter");
                return Ok(Allocation {
                    title: expected,
                    advanced: true,
                });
            }

            debug!(attempt, "allocator state changed underneath us, retrying");
        }

        Err(AllocatorError::Conflict {
            attempts: MAX_SWAP_ATTEMPTS,
        })
    }

    /// Replace the prefix and rebase numbering so the next suggestion is
    /// `reset_counter_to + 1`.
    #[instrument(skip(self))]
    pub fn update_prefix(
        &self,
        new_prefix: &str,
        reset_counter_to: u64,
    ) -> Result<AllocatorState, Error> {
        let new_prefix = new_prefix.trim();
        if new_prefix.is_empty() {
            return Err(ValidationError::EmptyPrefix.into());
        }

        let next = AllocatorState {
            prefix: new_prefix.to_string(),
            counter: reset_counter_to,
        };

        for attempt in 1..=MAX_SWAP_ATTEMPTS {
            let current = self.store.load().map_err(AllocatorError::from)?;
            if self
                .store
                .compare_and_swap(&current, &next)
                .map_err(AllocatorError::from)?
            {
                info!(prefix = %next.prefix, counter = next.counter, "rebased title numbering");
                return Ok(next);
            }

            debug!(attempt, "allocator state changed during rebase, retrying");
        }

        Err(AllocatorError::Conflict {
            attempts: MAX_SWAP_ATTEMPTS,
        }
        .into())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use crate::db::Database;
    use crate::error::AllocatorError;
    use crate::store::AllocatorStore;
    use crate::title::{AllocatorState, TitleAllocator, TitleRule};

    fn allocator_at(counter: u64, rule: TitleRule) -> TitleAllocator<Database> {
        let db = Arc::new(Database::memory().unwrap());
        let initial = db.load().unwrap();
        let state = AllocatorState {
            prefix: "Video".to_string(),
            counter,
        };
        assert!(db.compare_and_swap(&initial, &state).unwrap());

        TitleAllocator::new(db, rule)
    }

    #[test]
    pub fn test_default_state() {
        let allocator = TitleAllocator::new(Arc::new(Database::memory().unwrap()), TitleRule::Spaced);

        assert_eq!(allocator.state().unwrap(), AllocatorState::default());
        assert_eq!(allocator.suggest().unwrap(), "Video 1");
    }

    #[test]
    pub fn test_accepting_suggestion_advances() {
        let allocator = allocator_at(5, TitleRule::Spaced);

        let allocation = allocator.suggest_and_maybe_advance("Video 6").unwrap();
        assert!(allocation.advanced);
        assert_eq!(allocation.title, "Video 6");
        assert_eq!(allocator.state().unwrap().counter, 6);
        assert_eq!(allocator.suggest().unwrap(), "Video 7");
    }

    #[test]
    pub fn test_candidate_is_trimmed_for_matching() {
        let allocator = allocator_at(5, TitleRule::Spaced);

        let allocation = allocator.suggest_and_maybe_advance("  Video 6 ").unwrap();
        assert!(allocation.advanced);
        assert_eq!(allocation.title, "Video 6");
    }

    #[test]
    pub fn test_custom_title_kept_verbatim() {
        let allocator = allocator_at(5, TitleRule::Spaced);

        let allocation = allocator.suggest_and_maybe_advance("My Custom Title").unwrap();
        assert!(!allocation.advanced);
        assert_eq!(allocation.title, "My Custom Title");
        assert_eq!(allocator.state().unwrap().counter, 5);

        // A stale or skipped number is also just a custom title.
        assert!(!allocator.suggest_and_maybe_advance("Video 5").unwrap().advanced);
        assert!(!allocator.suggest_and_maybe_advance("Video 7").unwrap().advanced);
        assert_eq!(allocator.state().unwrap().counter, 5);
    }

    #[test]
    pub fn test_suffixed_rule() {
        let allocator = allocator_at(5, TitleRule::Suffixed);

        assert_eq!(allocator.suggest().unwrap(), "Video6");
        assert!(!allocator.suggest_and_maybe_advance("Video 6").unwrap().advanced);
        assert!(allocator.suggest_and_maybe_advance("Video6").unwrap().advanced);
    }

    #[test]
    pub fn test_update_prefix_rebases() {
        let allocator = allocator_at(5, TitleRule::Spaced);

        let state = allocator.update_prefix("Episode", 41).unwrap();
        assert_eq!(state.prefix, "Episode");
        assert_eq!(state.counter, 41);
        assert_eq!(allocator.suggest().unwrap(), "Episode 42");

        assert!(!allocator.suggest_and_maybe_advance("Video 6").unwrap().advanced);
        assert!(allocator.suggest_and_maybe_advance("Episode 42").unwrap().advanced);

        assert!(allocator.update_prefix("   ", 0).is_err());
    }

    #[test]
    pub fn test_concurrent_accepts_never_duplicate() {
        const WORKERS: usize = 8;
        const PER_WORKER: usize = 5;

        let allocator = TitleAllocator::new(Arc::new(Database::memory().unwrap()), TitleRule::Spaced);

        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let allocator = allocator.clone();
                thread::spawn(move || {
                    let mut accepted = Vec::new();
                    while accepted.len() < PER_WORKER {
                        let predicted = allocator.suggest().unwrap();
                        match allocator.suggest_and_maybe_advance(&predicted) {
                            Ok(allocation) if allocation.advanced => accepted.push(allocation.title),
                            Ok(_) | Err(AllocatorError::Conflict { .. }) => continue,
                            Err(e) => panic!("unexpected allocator error: {e}"),
                        }
                    }
                    accepted
                })
            })
            .collect();

        let titles: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let distinct: HashSet<&String> = titles.iter().collect();

        let total = WORKERS * PER_WORKER;
        assert_eq!(titles.len(), total);
        assert_eq!(distinct.len(), total);
        for n in 1..=total {
            assert!(distinct.contains(&format!("Video {n}")), "missing Video {n}");
        }
        assert_eq!(allocator.state().unwrap().counter, total as u64);
    }
}
