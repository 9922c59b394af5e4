//! Static plan catalog

use std::collections::{HashMap, HashSet};

use plaza_types::{Feature, Limit, Plan, PlanDefinition, ALL_PLANS};

/// Static table mapping each plan to its price, commission rate, capability
/// set, and per-feature limits. Pure lookup, no state.
///
/// An unknown or missing plan is a configuration-integrity failure caught at
/// construction, never a runtime branch.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    // Indexed by Plan::rank(); completeness guaranteed at construction.
    plans: Vec<PlanDefinition>,
}

impl PlanCatalog {
    /// The built-in marketplace catalog.
    pub fn builtin() -> Self {
        Self {
            plans: builtin_definitions(),
        }
    }

    /// Build a catalog from caller-supplied definitions.
    ///
    /// Every plan must be defined exactly once, and every metered feature
    /// must also be a capability of its plan (the guard checks capability
    /// before budget, so a metered-but-not-granted feature would be
    /// unreachable).
    pub fn from_definitions(definitions: Vec<PlanDefinition>) -> Result<Self, CatalogError> {
        let mut slots: Vec<Option<PlanDefinition>> = vec![None; ALL_PLANS.len()];

        for def in definitions {
            for (feature, _) in &def.limits {
                if !def.capabilities.contains(feature) {
                    return Err(CatalogError::MeteredFeatureNotGranted {
                        plan: def.id,
                        feature: *feature,
                    });
                }
            }
            let slot = &mut slots[def.id.rank() as usize];
            if slot.is_some() {
                return Err(CatalogError::DuplicatePlan(def.id));
            }
            *slot = Some(def);
        }

        let mut plans = Vec::with_capacity(ALL_PLANS.len());
        for (plan, slot) in ALL_PLANS.into_iter().zip(slots) {
            plans.push(slot.ok_or(CatalogError::MissingPlan(plan))?);
        }

        Ok(Self { plans })
    }

    /// Full definition for a plan
    pub fn definition(&self, plan: Plan) -> &PlanDefinition {
        &self.plans[plan.rank() as usize]
    }

    /// The per-period limit for a feature, or `None` when the feature is
    /// not metered on this plan
    pub fn limit_for(&self, plan: Plan, feature: Feature) -> Option<Limit> {
        self.definition(plan).limits.get(&feature).copied()
    }

    /// Capability flags granted by a plan
    pub fn capabilities_of(&self, plan: Plan) -> &HashSet<Feature> {
        &self.definition(plan).capabilities
    }

    /// Whether a plan includes a capability
    pub fn has_capability(&self, plan: Plan, feature: Feature) -> bool {
        self.definition(plan).capabilities.contains(&feature)
    }

    /// Numeric rank for plan hierarchy comparisons
    pub fn rank(&self, plan: Plan) -> u8 {
        plan.rank()
    }

    /// All plan definitions, lowest rank first
    pub fn plans(&self) -> impl Iterator<Item = &PlanDefinition> {
        self.plans.iter()
    }
}

/// Catalog construction failures. Fatal at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// A plan has no definition
    #[error("missing definition for plan {0}")]
    MissingPlan(Plan),

    /// A plan is defined more than once
    #[error("duplicate definition for plan {0}")]
    DuplicatePlan(Plan),

    /// A limits entry names a feature outside the plan's capability set
    #[error("plan {plan} meters feature {feature} without granting it")]
    MeteredFeatureNotGranted { plan: Plan, feature: Feature },
}

fn builtin_definitions() -> Vec<PlanDefinition> {
    vec![
        PlanDefinition {
            id: Plan::Free,
            display_name: "Free".to_string(),
            monthly_price_cents: 0,
            commission_rate_bps: 1_500,
            capabilities: HashSet::from([
                Feature::Services,
                Feature::Bookings,
                Feature::PortfolioImages,
                Feature::Messaging,
            ]),
            limits: HashMap::from([
                (Feature::Services, Limit::Capped(3)),
                (Feature::Bookings, Limit::Capped(10)),
                (Feature::PortfolioImages, Limit::Capped(5)),
            ]),
        },
        PlanDefinition {
            id: Plan::Professional,
            display_name: "Professional".to_string(),
            monthly_price_cents: 2_900,
            commission_rate_bps: 1_000,
            capabilities: HashSet::from([
                Feature::Services,
                Feature::Bookings,
                Feature::PortfolioImages,
                Feature::Messaging,
                Feature::Analytics,
                Feature::FeaturedListings,
            ]),
            limits: HashMap::from([
                (Feature::Services, Limit::Capped(10)),
                (Feature::Bookings, Limit::Capped(50)),
                (Feature::PortfolioImages, Limit::Capped(25)),
            ]),
        },
        PlanDefinition {
            id: Plan::Business,
            display_name: "Business".to_string(),
            monthly_price_cents: 7_900,
            commission_rate_bps: 700,
            capabilities: HashSet::from([
                Feature::Services,
                Feature::Bookings,
                Feature::PortfolioImages,
                Feature::Messaging,
                Feature::Analytics,
                Feature::FeaturedListings,
                Feature::TeamMembers,
                Feature::ApiAccess,
            ]),
            limits: HashMap::from([
                (Feature::Services, Limit::Capped(50)),
                (Feature::Bookings, Limit::Capped(200)),
                (Feature::PortfolioImages, Limit::Unlimited),
                (Feature::TeamMembers, Limit::Capped(5)),
            ]),
        },
        PlanDefinition {
            id: Plan::Elite,
            display_name: "Elite".to_string(),
            monthly_price_cents: 19_900,
            commission_rate_bps: 500,
            capabilities: HashSet::from([
                Feature::Services,
                Feature::Bookings,
                Feature::PortfolioImages,
                Feature::Messaging,
                Feature::Analytics,
                Feature::FeaturedListings,
                Feature::TeamMembers,
                Feature::ApiAccess,
                Feature::CustomBranding,
                Feature::PrioritySupport,
            ]),
            limits: HashMap::from([
                (Feature::Services, Limit::Unlimited),
                (Feature::Bookings, Limit::Unlimited),
                (Feature::PortfolioImages, Limit::Unlimited),
                (Feature::TeamMembers, Limit::Unlimited),
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_plan() {
        let catalog = PlanCatalog::builtin();
        for plan in ALL_PLANS {
            assert_eq!(catalog.definition(plan).id, plan);
        }
    }

    #[test]
    fn test_builtin_passes_validation() {
        assert!(PlanCatalog::from_definitions(builtin_definitions()).is_ok());
    }

    #[test]
    fn test_limits_tighten_down_the_ranks() {
        let catalog = PlanCatalog::builtin();
        assert_eq!(
            catalog.limit_for(Plan::Free, Feature::Services),
            Some(Limit::Capped(3))
        );
        assert_eq!(
            catalog.limit_for(Plan::Professional, Feature::Services),
            Some(Limit::Capped(10))
        );
        assert_eq!(
            catalog.limit_for(Plan::Elite, Feature::Services),
            Some(Limit::Unlimited)
        );
    }

    #[test]
    fn test_capability_only_feature_has_no_limit() {
        let catalog = PlanCatalog::builtin();
        assert!(catalog.has_capability(Plan::Free, Feature::Messaging));
        assert_eq!(catalog.limit_for(Plan::Free, Feature::Messaging), None);
    }

    #[test]
    fn test_unknown_capability_denied() {
        let catalog = PlanCatalog::builtin();
        assert!(!catalog.has_capability(Plan::Free, Feature::Analytics));
        assert!(!catalog.has_capability(Plan::Business, Feature::CustomBranding));
    }

    #[test]
    fn test_missing_plan_rejected() {
        let mut defs = builtin_definitions();
        defs.pop();
        assert!(matches!(
            PlanCatalog::from_definitions(defs),
            Err(CatalogError::MissingPlan(Plan::Elite))
        ));
    }

    #[test]
    fn test_duplicate_plan_rejected() {
        let mut defs = builtin_definitions();
        defs.push(defs[0].clone());
        assert!(matches!(
            PlanCatalog::from_definitions(defs),
            Err(CatalogError::DuplicatePlan(Plan::Free))
        ));
    }

    #[test]
    fn test_metered_feature_must_be_granted() {
        let mut defs = builtin_definitions();
        defs[0]
            .limits
            .insert(Feature::TeamMembers, Limit::Capped(1));
        assert!(matches!(
            PlanCatalog::from_definitions(defs),
            Err(CatalogError::MeteredFeatureNotGranted {
                plan: Plan::Free,
                feature: Feature::TeamMembers,
            })
        ));
    }
}
