// Splits a resolved plan into the two network windows of a run.

use crate::schemas::tools::{Phase, ToolId};

/// The resolved plan split by network phase. Relative order is preserved
/// in both halves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhasePlan {
    pub public: Vec<ToolId>,
    pub private: Vec<ToolId>,
}

impl PhasePlan {
    pub fn contains(&self, tool: ToolId) -> bool {
        self.public.contains(&tool) || self.private.contains(&tool)
    }
}

/// Partitions `plan` with `phase_of`. Anything not classified as public
/// goes to the private half.
pub fn classify_with<T: Copy, F: Fn(T) -> Phase>(plan: &[T], phase_of: F) -> (Vec<T>, Vec<T>) {
    plan.iter().copied().partition(|&item| phase_of(item) == Phase::Public)
}

pub fn classify(plan: &[ToolId]) -> PhasePlan {
    let (public, private) = classify_with(plan, ToolId::phase);
    PhasePlan { public, private }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::resolver::{Catalog, resolve};

    #[test]
    fn partition_keeps_order_and_union() {
        let plan = resolve(&Catalog, &ToolId::ALL);
        let split = classify(&plan);

        let mut rejoined: Vec<ToolId> = split.public.iter().chain(split.private.iter()).copied().collect();
        rejoined.sort_by_key(|t| plan.iter().position(|p| p == t));
        assert_eq!(rejoined, plan);

        for half in [&split.public, &split.private] {
            let positions: Vec<usize> = half.iter().map(|t| plan.iter().position(|p| p == t).unwrap()).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn public_half_is_the_vpn_off_toolchain() {
        let split = classify(&resolve(&Catalog, &[ToolId::HopsCli, ToolId::Iterm2]));
        assert_eq!(
            split.public,
            vec![ToolId::Xcode, ToolId::Homebrew, ToolId::Pyenv, ToolId::Python313, ToolId::Iterm2]
        );
        assert_eq!(split.private, vec![ToolId::SpartaPki, ToolId::HopsCli]);
        assert!(split.contains(ToolId::SpartaPki));
        assert!(!split.contains(ToolId::Ncpcli));
    }

    #[test]
    fn unclassified_items_default_to_private() {
        let (public, private) = classify_with(&[1, 2, 3, 4], |n| if n % 2 == 0 { Phase::Public } else { Phase::Private });
        assert_eq!(public, vec![2, 4]);
        assert_eq!(private, vec![1, 3]);
    }
}
