use crate::config::Config;
use crate::error::{BotError, BotResult};
use crate::models::{Group, NewGroup, RoutingLetter};
use crate::storage::Repository;

/// Rounds of select-then-create before giving up. Each round can only fail
/// when concurrent finishers filled every candidate in between.
const MAX_ALLOCATION_ROUNDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// The group after the slot was taken.
    pub group: Group,
    pub created: bool,
}

/// Resolves a routing letter to a group with room and takes one slot in it.
pub struct GroupAllocator<'a> {
    repo: &'a dyn Repository,
    config: &'a Config,
}

impl<'a> GroupAllocator<'a> {
    pub fn new(repo: &'a dyn Repository, config: &'a Config) -> Self {
        Self { repo, config }
    }

    pub async fn allocate(&self, letter: RoutingLetter) -> BotResult<Allocation> {
        let capacity = self.config.group_capacity;

        for round in 0..MAX_ALLOCATION_ROUNDS {
            let groups = self.repo.list_groups(Some(letter.as_char())).await?;
            for candidate in groups.iter().filter(|g| g.has_room(capacity)) {
                if let Some(group) = self.repo.try_reserve_slot(candidate.id, capacity).await? {
                    log::debug!(
                        "reserved a slot in {} ({}/{})",
                        group.label,
                        group.current_count,
                        group.effective_capacity(capacity)
                    );
                    return Ok(Allocation {
                        group,
                        created: false,
                    });
                }
            }

            if let Some(allocation) = self.reserve_in_new_group(letter).await? {
                return Ok(allocation);
            }
            log::warn!(
                "new {} group filled up before it could be used (round {})",
                letter,
                round + 1
            );
        }

        Err(BotError::AllocationExhausted(letter))
    }

    /// Creates the next group for `letter` and takes a slot in it. Suffixes
    /// only ever grow and a deleted one is never reused. When a concurrent
    /// finisher took the label first, its group is tried before moving on.
    async fn reserve_in_new_group(
        &self,
        letter: RoutingLetter,
    ) -> BotResult<Option<Allocation>> {
        let capacity = self.config.group_capacity;
        let highest = self.repo.highest_suffix(letter.as_char()).await?;
        let mut suffix = next_suffix(letter, highest)?;
        loop {
            let label = format!("{}{}", letter, suffix);
            let new_group = NewGroup {
                url: self.config.group_url(&label),
                label: label.clone(),
                capacity: Some(capacity),
            };
            if let Some(group) = self.repo.create_group(new_group).await? {
                log::info!("created group {} ({})", group.label, group.url);
                let reserved = self.repo.try_reserve_slot(group.id, capacity).await?;
                return Ok(reserved.map(|group| Allocation {
                    group,
                    created: true,
                }));
            }

            if let Some(group) = self.reserve_by_label(letter, &label).await? {
                log::debug!("joined concurrently created group {}", group.label);
                return Ok(Some(Allocation {
                    group,
                    created: false,
                }));
            }
            suffix = next_suffix(letter, suffix)?;
        }
    }

    async fn reserve_by_label(
        &self,
        letter: RoutingLetter,
        label: &str,
    ) -> BotResult<Option<Group>> {
        let groups = self.repo.list_groups(Some(letter.as_char())).await?;
        let Some(existing) = groups.into_iter().find(|g| g.label == label) else {
            return Ok(None);
        };
        Ok(self
            .repo
            .try_reserve_slot(existing.id, self.config.group_capacity)
            .await?)
    }
}

/// Labels have run out when the suffix cannot grow any further.
fn next_suffix(letter: RoutingLetter, suffix: u32) -> BotResult<u32> {
    suffix.checked_add(1).ok_or_else(|| {
        log::error!("no suffix left above {}{}", letter, suffix);
        BotError::AllocationExhausted(letter)
    })
}
