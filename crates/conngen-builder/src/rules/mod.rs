//! Two-population connection rules
//!
//! Each rule validates its own parameters at construction and implements
//! the connect algorithm on top of [`BuilderCore`]. Rules that support
//! structural plasticity or disconnection implement those paths too; the
//! others fall back to the `NotImplemented` defaults in [`Rule`].

mod all_to_all;
mod bernoulli;
mod fixed_indegree;
mod fixed_outdegree;
mod fixed_total_number;
mod one_to_one;
mod symmetric_bernoulli;

pub(crate) use all_to_all::AllToAll;
pub(crate) use bernoulli::Bernoulli;
pub(crate) use fixed_indegree::FixedInDegree;
pub(crate) use fixed_outdegree::FixedOutDegree;
pub(crate) use fixed_total_number::FixedTotalNumber;
pub(crate) use one_to_one::OneToOne;
pub(crate) use symmetric_bernoulli::SymmetricBernoulli;

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    spec::RuleSpec,
};

pub(crate) const SP_NOT_IMPLEMENTED: &str =
    "This connection rule is not implemented for structural plasticity.";
pub(crate) const DISCONNECT_NOT_IMPLEMENTED: &str = "This disconnection rule is not implemented.";

/// A two-population rule, ready to run
#[derive(Debug)]
pub(crate) enum Rule {
    OneToOne(OneToOne),
    AllToAll(AllToAll),
    FixedInDegree(FixedInDegree),
    FixedOutDegree(FixedOutDegree),
    FixedTotalNumber(FixedTotalNumber),
    Bernoulli(Bernoulli),
    SymmetricBernoulli(SymmetricBernoulli),
}

impl Rule {
    /// Validate the rule parameters against the populations in `core`
    pub(crate) fn new(core: &BuilderCore<'_>, spec: &RuleSpec) -> Result<Self> {
        Ok(match spec {
            RuleSpec::OneToOne => Self::OneToOne(OneToOne::new(core)?),
            RuleSpec::AllToAll => Self::AllToAll(AllToAll),
            RuleSpec::FixedIndegree { indegree } => {
                Self::FixedInDegree(FixedInDegree::new(core, indegree)?)
            }
            RuleSpec::FixedOutdegree { outdegree } => {
                Self::FixedOutDegree(FixedOutDegree::new(core, outdegree)?)
            }
            RuleSpec::FixedTotalNumber { n } => {
                Self::FixedTotalNumber(FixedTotalNumber::new(core, *n)?)
            }
            RuleSpec::PairwiseBernoulli { p } => Self::Bernoulli(Bernoulli::new(core, p)?),
            RuleSpec::SymmetricPairwiseBernoulli { p } => {
                Self::SymmetricBernoulli(SymmetricBernoulli::new(core, *p)?)
            }
            RuleSpec::TripartiteBernoulliWithPool { .. } => {
                return Err(ConnError::bad_property(
                    "Rule tripartite_bernoulli_with_pool requires a third-factor population.",
                ))
            }
        })
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::OneToOne(_) => "one_to_one",
            Self::AllToAll(_) => "all_to_all",
            Self::FixedInDegree(_) => "fixed_indegree",
            Self::FixedOutDegree(_) => "fixed_outdegree",
            Self::FixedTotalNumber(_) => "fixed_total_number",
            Self::Bernoulli(_) => "pairwise_bernoulli",
            Self::SymmetricBernoulli(_) => "symmetric_pairwise_bernoulli",
        }
    }

    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        match self {
            Self::OneToOne(rule) => rule.connect(core),
            Self::AllToAll(rule) => rule.connect(core),
            Self::FixedInDegree(rule) => rule.connect(core),
            Self::FixedOutDegree(rule) => rule.connect(core),
            Self::FixedTotalNumber(rule) => rule.connect(core),
            Self::Bernoulli(rule) => rule.connect(core),
            Self::SymmetricBernoulli(rule) => rule.connect(core),
        }
    }

    pub(crate) fn disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        match self {
            Self::OneToOne(rule) => rule.disconnect(core),
            Self::AllToAll(rule) => rule.disconnect(core),
            _ => Err(ConnError::not_implemented(DISCONNECT_NOT_IMPLEMENTED)),
        }
    }

    pub(crate) fn sp_connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        match self {
            Self::OneToOne(rule) => rule.sp_connect(core),
            Self::AllToAll(rule) => rule.sp_connect(core),
            _ => Err(ConnError::not_implemented(SP_NOT_IMPLEMENTED)),
        }
    }

    pub(crate) fn sp_disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        match self {
            Self::OneToOne(rule) => rule.sp_disconnect(core),
            Self::AllToAll(rule) => rule.sp_disconnect(core),
            _ => Err(ConnError::not_implemented(SP_NOT_IMPLEMENTED)),
        }
    }

    /// Whether `make_symmetric` may be requested
    pub(crate) fn supports_symmetric(&self) -> bool {
        matches!(self, Self::OneToOne(_) | Self::SymmetricBernoulli(_))
    }

    /// Whether the rule produces mirrored edges by itself
    pub(crate) fn creates_symmetric(&self) -> bool {
        matches!(self, Self::SymmetricBernoulli(_))
    }

    /// Whether the resulting topology is symmetric without mirroring
    pub(crate) fn is_symmetric(&self, core: &BuilderCore<'_>) -> bool {
        match self {
            Self::AllToAll(_) => core.sources() == core.targets() && core.all_parameters_scalar(),
            _ => false,
        }
    }

    /// Whether targets must be nodes with proxies
    pub(crate) fn requires_proxies(&self) -> bool {
        !matches!(self, Self::OneToOne(_) | Self::AllToAll(_))
    }
}

/// Shared bound checks for fixed in- and out-degree
///
/// `label` is "Indegree" or "Outdegree"; `population` is the size of the
/// population the edges are drawn from.
pub(crate) fn check_degree(
    label: &str,
    degree: i64,
    population: usize,
    allow_autapses: bool,
    allow_multapses: bool,
) -> Result<()> {
    if !allow_multapses {
        let population = population as i64;
        if degree > population {
            return Err(ConnError::bad_property(format!(
                "{} cannot be larger than population size.",
                label
            )));
        } else if degree == population && !allow_autapses {
            log::warn!(
                "Multapses and autapses prohibited. When the sources and the targets have a \
                 non-empty intersection, the connect algorithm will enter an infinite loop."
            );
            return Ok(());
        }

        if degree as f64 > 0.9 * population as f64 {
            log::warn!(
                "Multapses are prohibited and you request more than 90% connectivity. \
                 Expect long connecting times!"
            );
        }
    }

    if degree < 0 {
        return Err(ConnError::bad_property(format!(
            "{} cannot be less than zero.",
            label
        )));
    }
    Ok(())
}

/// Round a drawn degree to a count; negative draws become zero
pub(crate) fn degree_count(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.round() as usize
    } else {
        0
    }
}
