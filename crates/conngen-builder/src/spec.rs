//! Connection and synapse specifications

use crate::{
    error::{ConnError, Result},
    param::ParamValue,
};
use conngen_kernel::{DEFAULT_SYNAPSE_MODEL, DELAY, WEIGHT};

use std::{collections::BTreeMap, str::FromStr};

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "serde")]
fn default_one() -> f64 {
    1.0
}

#[cfg(feature = "serde")]
fn default_model() -> Option<String> {
    Some(DEFAULT_SYNAPSE_MODEL.to_string())
}

/// How the third-factor pool of a target is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PoolType {
    /// Pool drawn at random per target
    #[default]
    Random,
    /// Consecutive slice of the third population, determined by the target index
    Block,
}

impl FromStr for PoolType {
    type Err = ConnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(Self::Random),
            "block" => Ok(Self::Block),
            _ => Err(ConnError::bad_property("pool_type must be 'random' or 'block'")),
        }
    }
}

/// Connection rule with its rule-specific parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "rule", rename_all = "snake_case"))]
pub enum RuleSpec {
    /// i-th source to i-th target
    OneToOne,
    /// Every source to every target
    AllToAll,
    /// Each target receives `indegree` edges from random sources
    FixedIndegree {
        /// Edges per target
        indegree: ParamValue,
    },
    /// Each source sends `outdegree` edges to random targets
    FixedOutdegree {
        /// Edges per source
        outdegree: ParamValue,
    },
    /// Exactly `n` edges between random pairs
    FixedTotalNumber {
        /// Total edge count
        #[cfg_attr(feature = "serde", serde(rename = "N"))]
        n: i64,
    },
    /// Each pair connected independently with probability `p`
    PairwiseBernoulli {
        /// Connection probability
        p: ParamValue,
    },
    /// Bernoulli connectivity with every edge mirrored
    SymmetricPairwiseBernoulli {
        /// Connection probability
        p: f64,
    },
    /// Bernoulli primary edges plus third-factor edges through a pool
    TripartiteBernoulliWithPool {
        /// Probability of a primary edge
        #[cfg_attr(feature = "serde", serde(default = "default_one"))]
        p_primary: f64,
        /// Probability of third-factor edges given a primary edge
        #[cfg_attr(feature = "serde", serde(default = "default_one"))]
        p_third_if_primary: f64,
        /// Third-factor pool size per target; the full third population if unset
        #[cfg_attr(feature = "serde", serde(default))]
        pool_size: Option<i64>,
        /// Pool selection strategy
        #[cfg_attr(feature = "serde", serde(default))]
        pool_type: PoolType,
    },
}

impl RuleSpec {
    /// Rule name as used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::AllToAll => "all_to_all",
            Self::FixedIndegree { .. } => "fixed_indegree",
            Self::FixedOutdegree { .. } => "fixed_outdegree",
            Self::FixedTotalNumber { .. } => "fixed_total_number",
            Self::PairwiseBernoulli { .. } => "pairwise_bernoulli",
            Self::SymmetricPairwiseBernoulli { .. } => "symmetric_pairwise_bernoulli",
            Self::TripartiteBernoulliWithPool { .. } => "tripartite_bernoulli_with_pool",
        }
    }
}

/// Connection specification: rule plus topology flags
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ConnSpec {
    /// Connection rule
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub rule: RuleSpec,
    /// Allow edges from a node to itself
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub allow_autapses: bool,
    /// Allow more than one edge per ordered pair
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub allow_multapses: bool,
    /// Create the reverse of every edge as well
    #[cfg_attr(feature = "serde", serde(default))]
    pub make_symmetric: bool,
}

impl ConnSpec {
    /// Specification for `rule` with default flags
    pub fn new(rule: RuleSpec) -> Self {
        Self {
            rule,
            allow_autapses: true,
            allow_multapses: true,
            make_symmetric: false,
        }
    }

    /// One-to-one rule
    pub fn one_to_one() -> Self {
        Self::new(RuleSpec::OneToOne)
    }

    /// All-to-all rule
    pub fn all_to_all() -> Self {
        Self::new(RuleSpec::AllToAll)
    }

    /// Fixed in-degree rule
    pub fn fixed_indegree(indegree: impl Into<ParamValue>) -> Self {
        Self::new(RuleSpec::FixedIndegree {
            indegree: indegree.into(),
        })
    }

    /// Fixed out-degree rule
    pub fn fixed_outdegree(outdegree: impl Into<ParamValue>) -> Self {
        Self::new(RuleSpec::FixedOutdegree {
            outdegree: outdegree.into(),
        })
    }

    /// Fixed total number rule
    pub fn fixed_total_number(n: i64) -> Self {
        Self::new(RuleSpec::FixedTotalNumber { n })
    }

    /// Pairwise Bernoulli rule
    pub fn pairwise_bernoulli(p: impl Into<ParamValue>) -> Self {
        Self::new(RuleSpec::PairwiseBernoulli { p: p.into() })
    }

    /// Symmetric pairwise Bernoulli rule
    ///
    /// The rule additionally requires `make_symmetric`, no autapses and
    /// multapses allowed; set those with the `with_*` methods.
    pub fn symmetric_pairwise_bernoulli(p: f64) -> Self {
        Self::new(RuleSpec::SymmetricPairwiseBernoulli { p })
    }

    /// Tripartite Bernoulli rule with a random pool spanning the whole third population
    pub fn tripartite_bernoulli_with_pool(p_primary: f64, p_third_if_primary: f64) -> Self {
        Self::new(RuleSpec::TripartiteBernoulliWithPool {
            p_primary,
            p_third_if_primary,
            pool_size: None,
            pool_type: PoolType::Random,
        })
    }

    /// Set the pool of a tripartite rule; no effect on other rules
    pub fn with_pool(mut self, size: i64, kind: PoolType) -> Self {
        if let RuleSpec::TripartiteBernoulliWithPool {
            pool_size,
            pool_type,
            ..
        } = &mut self.rule
        {
            *pool_size = Some(size);
            *pool_type = kind;
        }
        self
    }

    /// Set whether autapses are allowed
    pub fn with_autapses(mut self, allow: bool) -> Self {
        self.allow_autapses = allow;
        self
    }

    /// Set whether multapses are allowed
    pub fn with_multapses(mut self, allow: bool) -> Self {
        self.allow_multapses = allow;
        self
    }

    /// Set whether every edge is mirrored
    pub fn with_symmetric(mut self, make_symmetric: bool) -> Self {
        self.make_symmetric = make_symmetric;
        self
    }
}

/// Synapse specification: model plus per-edge parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct SynSpec {
    /// Synapse model name
    #[cfg_attr(feature = "serde", serde(default = "default_model"))]
    pub synapse_model: Option<String>,
    /// Explicit weight; model default if unset
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: Option<ParamValue>,
    /// Explicit delay in milliseconds; model default if unset
    #[cfg_attr(feature = "serde", serde(default))]
    pub delay: Option<ParamValue>,
    /// Presynaptic element for structural plasticity
    #[cfg_attr(feature = "serde", serde(default))]
    pub pre_synaptic_element: Option<String>,
    /// Postsynaptic element for structural plasticity
    #[cfg_attr(feature = "serde", serde(default))]
    pub post_synaptic_element: Option<String>,
    /// Further model parameters
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub params: BTreeMap<String, ParamValue>,
}

impl Default for SynSpec {
    fn default() -> Self {
        Self::new(DEFAULT_SYNAPSE_MODEL)
    }
}

impl SynSpec {
    /// Specification for the named model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            synapse_model: Some(model.into()),
            weight: None,
            delay: None,
            pre_synaptic_element: None,
            post_synaptic_element: None,
            params: BTreeMap::new(),
        }
    }

    /// Specification without a model name
    pub fn without_model() -> Self {
        Self {
            synapse_model: None,
            ..Self::default()
        }
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: impl Into<ParamValue>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    /// Set the delay
    pub fn with_delay(mut self, delay: impl Into<ParamValue>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    /// Set a model parameter; `weight` and `delay` go to their own fields
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let name = name.into();
        match name.as_str() {
            WEIGHT => self.weight = Some(value.into()),
            DELAY => self.delay = Some(value.into()),
            _ => {
                self.params.insert(name, value.into());
            }
        }
        self
    }

    /// Set both structural-plasticity element names
    pub fn with_synaptic_elements(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.pre_synaptic_element = Some(pre.into());
        self.post_synaptic_element = Some(post.into());
        self
    }

    /// Whether any structural-plasticity element is named
    pub fn uses_structural_plasticity(&self) -> bool {
        self.pre_synaptic_element.is_some() || self.post_synaptic_element.is_some()
    }
}

/// Synapse specifications of the three edge sets of a tripartite rule
///
/// An empty list means one default synapse spec.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TripartiteSynSpecs {
    /// Source to target
    pub primary: Vec<SynSpec>,
    /// Source to third-factor node
    pub third_in: Vec<SynSpec>,
    /// Third-factor node to target
    pub third_out: Vec<SynSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_spec_builders() {
        let spec = ConnSpec::fixed_indegree(3).with_autapses(false).with_multapses(false);
        assert_eq!(spec.rule.name(), "fixed_indegree");
        assert!(!spec.allow_autapses);
        assert!(!spec.allow_multapses);
        assert!(!spec.make_symmetric);

        let spec = ConnSpec::tripartite_bernoulli_with_pool(0.5, 0.2).with_pool(2, PoolType::Block);
        assert!(matches!(
            spec.rule,
            RuleSpec::TripartiteBernoulliWithPool {
                pool_size: Some(2),
                pool_type: PoolType::Block,
                ..
            }
        ));
    }

    #[test]
    fn test_syn_spec_param_routing() {
        let spec = SynSpec::new("stdp_synapse")
            .with_param("weight", 2.0)
            .with_param("tau_plus", 15.0);
        assert_eq!(spec.weight, Some(ParamValue::Double(2.0)));
        assert_eq!(spec.params.len(), 1);
        assert!(!spec.uses_structural_plasticity());
        assert_eq!(SynSpec::default().synapse_model.as_deref(), Some(DEFAULT_SYNAPSE_MODEL));
    }

    #[test]
    fn test_pool_type_parse() {
        assert_eq!("block".parse::<PoolType>().unwrap(), PoolType::Block);
        let err = "blocks".parse::<PoolType>().unwrap_err();
        assert_eq!(err, ConnError::bad_property("pool_type must be 'random' or 'block'"));
    }
}
