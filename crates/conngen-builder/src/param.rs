//! Per-connection parameter values
//!
//! A [`ParamValue`] is what a caller writes into a connection or synapse
//! spec. Builders turn each one into a [`ConnParameter`], which hands out
//! one value per created edge and keeps the per-thread read position of
//! array parameters.

use crate::error::{ConnError, Result};
use conngen_kernel::NodeId;

use core::fmt;
use rand::RngCore;
use rand_distr::{Distribution as _, Exp, LogNormal, Normal, Uniform};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Random distribution a parameter is drawn from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "distribution", rename_all = "snake_case"))]
pub enum Distribution {
    /// Uniform on `[min, max)`
    Uniform {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Normal with mean and standard deviation
    Normal {
        /// Mean
        mean: f64,
        /// Standard deviation
        std: f64,
    },
    /// Log-normal, parameterized by the underlying normal
    LogNormal {
        /// Mean of the underlying normal
        mu: f64,
        /// Standard deviation of the underlying normal
        sigma: f64,
    },
    /// Exponential with scale `beta` (mean)
    Exponential {
        /// Scale
        beta: f64,
    },
}

impl Distribution {
    /// Check the distribution parameters
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Uniform { min, max } => min.is_finite() && max.is_finite() && min < max,
            Self::Normal { mean, std } => mean.is_finite() && std.is_finite() && std >= 0.0,
            Self::LogNormal { mu, sigma } => mu.is_finite() && sigma.is_finite() && sigma >= 0.0,
            Self::Exponential { beta } => beta.is_finite() && beta > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(ConnError::bad_property(format!("Invalid distribution parameters: {:?}", self)))
        }
    }

    /// Draw one value
    pub fn sample(&self, rng: &mut dyn RngCore) -> Result<f64> {
        self.validate()?;
        let bad = |e: &dyn fmt::Display| ConnError::bad_property(e.to_string());
        Ok(match *self {
            Self::Uniform { min, max } => Uniform::new(min, max).sample(rng),
            Self::Normal { mean, std } => Normal::new(mean, std).map_err(|e| bad(&e))?.sample(rng),
            Self::LogNormal { mu, sigma } => LogNormal::new(mu, sigma).map_err(|e| bad(&e))?.sample(rng),
            Self::Exponential { beta } => Exp::new(1.0 / beta).map_err(|e| bad(&e))?.sample(rng),
        })
    }
}

/// Node context passed to per-node expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamContext {
    /// Source of the edge being created, if any
    pub source: Option<NodeId>,
    /// Node the value is evaluated for (target, or source for outdegrees)
    pub node: Option<NodeId>,
}

impl ParamContext {
    /// Context for an edge
    pub fn edge(source: NodeId, target: NodeId) -> Self {
        Self {
            source: Some(source),
            node: Some(target),
        }
    }

    /// Context for a single node
    pub fn node(node: NodeId) -> Self {
        Self {
            source: None,
            node: Some(node),
        }
    }
}

type ExpressionFn = dyn Fn(&mut dyn RngCore, ParamContext) -> f64 + Send + Sync;

/// Parameter evaluated per edge from the involved nodes
#[derive(Clone)]
pub struct NodeExpression {
    eval: Arc<ExpressionFn>,
    integer: bool,
}

impl NodeExpression {
    /// Real-valued expression
    pub fn new<F>(eval: F) -> Self
    where
        F: Fn(&mut dyn RngCore, ParamContext) -> f64 + Send + Sync + 'static,
    {
        Self {
            eval: Arc::new(eval),
            integer: false,
        }
    }

    /// Integer-valued expression; results are rounded
    pub fn integer<F>(eval: F) -> Self
    where
        F: Fn(&mut dyn RngCore, ParamContext) -> f64 + Send + Sync + 'static,
    {
        Self {
            eval: Arc::new(eval),
            integer: true,
        }
    }

    /// Whether the expression yields integers
    pub fn is_integer(&self) -> bool {
        self.integer
    }

    /// Evaluate for the given context
    pub fn evaluate(&self, rng: &mut dyn RngCore, ctx: ParamContext) -> f64 {
        (self.eval)(rng, ctx)
    }
}

impl fmt::Debug for NodeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeExpression")
            .field("integer", &self.integer)
            .finish_non_exhaustive()
    }
}

impl PartialEq for NodeExpression {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.eval, &other.eval) && self.integer == other.integer
    }
}

/// User-facing parameter value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    /// Integer constant
    Int(i64),
    /// Real constant
    Double(f64),
    /// One integer per created edge, in creation order
    IntArray(Vec<i64>),
    /// One real per created edge, in creation order
    DoubleArray(Vec<f64>),
    /// Fresh draw per edge
    Random(Distribution),
    /// Per-node expression
    #[cfg_attr(feature = "serde", serde(skip))]
    Node(NodeExpression),
}

impl ParamValue {
    /// Whether the value is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Self::IntArray(_) | Self::DoubleArray(_))
    }

    /// Whether the value is a constant
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Double(_))
    }

    /// Constant value, if the parameter is a constant
    pub fn as_constant(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleArray(v)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntArray(v)
    }
}

impl From<Distribution> for ParamValue {
    fn from(d: Distribution) -> Self {
        Self::Random(d)
    }
}

impl From<NodeExpression> for ParamValue {
    fn from(e: NodeExpression) -> Self {
        Self::Node(e)
    }
}

/// Runtime parameter owned by a builder for the duration of one call
#[derive(Debug)]
pub struct ConnParameter {
    value: ParamValue,
    /// Read position per local thread, arrays only
    cursors: Vec<AtomicUsize>,
}

impl ConnParameter {
    /// Wrap a parameter value for `num_threads` local threads
    pub fn new(value: ParamValue, num_threads: usize) -> Result<Self> {
        if let ParamValue::Random(dist) = &value {
            dist.validate()?;
        }
        let cursors = if value.is_array() {
            (0..num_threads).map(|_| AtomicUsize::new(0)).collect()
        } else {
            Vec::new()
        };
        Ok(Self { value, cursors })
    }

    /// Wrap a rule parameter (degree or probability); arrays are rejected
    pub fn for_rule(name: &str, value: ParamValue, num_threads: usize) -> Result<Self> {
        if value.is_array() {
            return Err(ConnError::bad_property(format!(
                "{} must be a scalar, distribution or node expression",
                name
            )));
        }
        Self::new(value, num_threads)
    }

    /// Underlying user value
    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Constant value, if any
    pub fn constant(&self) -> Option<f64> {
        self.value.as_constant()
    }

    /// Next value as a real number
    pub fn value_double(&self, tid: usize, rng: &mut dyn RngCore, ctx: ParamContext) -> Result<f64> {
        match &self.value {
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Double(v) => Ok(*v),
            ParamValue::IntArray(values) => self.next(tid, values).map(|v| v as f64),
            ParamValue::DoubleArray(values) => self.next(tid, values),
            ParamValue::Random(dist) => dist.sample(rng),
            ParamValue::Node(expr) => Ok(expr.evaluate(rng, ctx)),
        }
    }

    /// Next value as an integer; only integer-typed parameters support this
    pub fn value_int(&self, tid: usize, rng: &mut dyn RngCore, ctx: ParamContext) -> Result<i64> {
        match &self.value {
            ParamValue::Int(v) => Ok(*v),
            ParamValue::IntArray(values) => self.next(tid, values),
            ParamValue::Node(expr) if expr.is_integer() => Ok(expr.evaluate(rng, ctx).round() as i64),
            other => Err(ConnError::invalid_parameter_type(format!(
                "integer value requested from real-valued parameter {:?}",
                other
            ))),
        }
    }

    fn next<T: Copy>(&self, tid: usize, values: &[T]) -> Result<T> {
        let cursor = self.cursor(tid)?;
        let idx = cursor.load(Ordering::Relaxed);
        let value = values.get(idx).copied().ok_or(ConnError::ParameterExhausted)?;
        cursor.store(idx + 1, Ordering::Relaxed);
        Ok(value)
    }

    fn cursor(&self, tid: usize) -> Result<&AtomicUsize> {
        self.cursors
            .get(tid)
            .ok_or_else(|| ConnError::internal(format!("no parameter cursor for thread {}", tid)))
    }

    /// Whether values are integer-typed
    pub fn provides_long(&self) -> bool {
        match &self.value {
            ParamValue::Int(_) | ParamValue::IntArray(_) => true,
            ParamValue::Node(expr) => expr.is_integer(),
            _ => false,
        }
    }

    /// Whether the parameter is an array
    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    /// Whether the parameter is a constant
    pub fn is_scalar(&self) -> bool {
        self.value.is_scalar()
    }

    /// Number of array entries, zero for non-arrays
    pub fn number_of_values(&self) -> usize {
        match &self.value {
            ParamValue::IntArray(v) => v.len(),
            ParamValue::DoubleArray(v) => v.len(),
            _ => 0,
        }
    }

    /// Advance thread `tid` past `n` values without using them
    pub fn skip(&self, tid: usize, n: usize) -> Result<()> {
        if !self.is_array() || n == 0 {
            return Ok(());
        }
        let cursor = self.cursor(tid)?;
        let idx = cursor.load(Ordering::Relaxed);
        if idx < self.number_of_values() {
            cursor.store(idx + n, Ordering::Relaxed);
            Ok(())
        } else {
            Err(ConnError::ParameterExhausted)
        }
    }

    /// Rewind to the unconsumed state
    ///
    /// Random and per-node parameters cannot be replayed and fail.
    pub fn reset(&self) -> Result<()> {
        match &self.value {
            ParamValue::Random(_) | ParamValue::Node(_) => Err(ConnError::not_implemented(
                "Symmetric connections require parameters that can be reset.",
            )),
            _ => {
                for cursor in &self.cursors {
                    cursor.store(0, Ordering::Relaxed);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn ctx() -> ParamContext {
        ParamContext::edge(NodeId::new(1), NodeId::new(2))
    }

    #[test]
    fn test_scalar_values() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = ConnParameter::new(ParamValue::Int(3), 2).unwrap();
        assert_eq!(p.value_int(0, &mut rng, ctx()).unwrap(), 3);
        assert_eq!(p.value_double(1, &mut rng, ctx()).unwrap(), 3.0);
        assert!(p.provides_long());
        assert!(p.is_scalar());

        let p = ConnParameter::new(ParamValue::Double(0.5), 2).unwrap();
        assert!(matches!(
            p.value_int(0, &mut rng, ctx()),
            Err(ConnError::InvalidParameterType { .. })
        ));
    }

    #[test]
    fn test_array_cursor_per_thread() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = ConnParameter::new(ParamValue::DoubleArray(vec![1.0, 2.0, 3.0]), 2).unwrap();
        assert_eq!(p.value_double(0, &mut rng, ctx()).unwrap(), 1.0);
        p.skip(0, 1).unwrap();
        assert_eq!(p.value_double(0, &mut rng, ctx()).unwrap(), 3.0);
        assert_eq!(p.value_double(0, &mut rng, ctx()), Err(ConnError::ParameterExhausted));

        // thread 1 has its own position
        assert_eq!(p.value_double(1, &mut rng, ctx()).unwrap(), 1.0);

        p.reset().unwrap();
        assert_eq!(p.value_double(0, &mut rng, ctx()).unwrap(), 1.0);
    }

    #[test]
    fn test_skip_past_end_fails() {
        let p = ConnParameter::new(ParamValue::IntArray(vec![1, 2]), 1).unwrap();
        p.skip(0, 2).unwrap();
        assert_eq!(p.skip(0, 1), Err(ConnError::ParameterExhausted));
        assert!(p.skip(0, 0).is_ok());
    }

    #[test]
    fn test_random_cannot_reset() {
        let p = ConnParameter::new(
            ParamValue::Random(Distribution::Uniform { min: 0.0, max: 1.0 }),
            1,
        )
        .unwrap();
        assert!(matches!(p.reset(), Err(ConnError::NotImplemented { .. })));

        let mut rng = StdRng::seed_from_u64(9);
        let v = p.value_double(0, &mut rng, ctx()).unwrap();
        assert!((0.0..1.0).contains(&v));
    }

    #[test]
    fn test_invalid_distribution_rejected() {
        let bad = ParamValue::Random(Distribution::Uniform { min: 1.0, max: 1.0 });
        assert!(ConnParameter::new(bad, 1).is_err());
        let bad = ParamValue::Random(Distribution::Exponential { beta: 0.0 });
        assert!(ConnParameter::new(bad, 1).is_err());
    }

    #[test]
    fn test_node_expression_sees_context() {
        let mut rng = StdRng::seed_from_u64(1);
        let expr = NodeExpression::integer(|_, ctx| ctx.node.map_or(0.0, |n| n.raw() as f64 * 2.0));
        let p = ConnParameter::new(ParamValue::Node(expr), 1).unwrap();
        assert!(p.provides_long());
        assert_eq!(p.value_int(0, &mut rng, ctx()).unwrap(), 4);
    }

    #[test]
    fn test_rule_parameters_reject_arrays() {
        assert!(ConnParameter::for_rule("indegree", ParamValue::IntArray(vec![1]), 1).is_err());
        assert!(ConnParameter::for_rule("indegree", ParamValue::Int(1), 1).is_ok());
    }
}
