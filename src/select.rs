use rand::Rng;

use crate::config::Host;

/// Picks which host serves a read-path call (`read`, `exists`, `size`).
///
/// Any host is assumed to hold an eventually-consistent copy, so reads are
/// not fanned out. Injectable so tests can pin the choice.
pub trait HostSelector: Send + Sync {
    /// `hosts` is never empty; the replicator rejects an empty host set at
    /// construction.
    fn pick<'a>(&self, hosts: &'a [Host]) -> &'a Host;
}

/// Uniform random choice, the default.
pub struct RandomSelector;

impl HostSelector for RandomSelector {
    fn pick<'a>(&self, hosts: &'a [Host]) -> &'a Host {
        let index = rand::thread_rng().gen_range(0..hosts.len());
        &hosts[index]
    }
}

/// Always the host at a fixed index, for deterministic tests.
pub struct FixedSelector(pub usize);

impl HostSelector for FixedSelector {
    fn pick<'a>(&self, hosts: &'a [Host]) -> &'a Host {
        &hosts[self.0 % hosts.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<Host> {
        vec![
            Host::from("media1:8080"),
            Host::from("media2:8080"),
            Host::from("media3:8080"),
        ]
    }

    #[test]
    fn test_fixed_selector() {
        let hosts = hosts();
        assert_eq!(FixedSelector(1).pick(&hosts), &hosts[1]);
        // Wraps around rather than panicking
        assert_eq!(FixedSelector(4).pick(&hosts), &hosts[1]);
    }

    #[test]
    fn test_random_selector_stays_in_set() {
        let hosts = hosts();
        for _ in 0..50 {
            let picked = RandomSelector.pick(&hosts);
            assert!(hosts.contains(picked));
        }
    }
}
