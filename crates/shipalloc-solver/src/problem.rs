/// A linear program over implicitly non-negative continuous variables
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// A constraint (or variable bound) not satisfied by a candidate point
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name, or the variable name for a negative value
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Evaluate the objective at `values`
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        dot(&self.objective.coefficients, values)
    }

    /// List every constraint (and non-negativity bound) that `values` violates
    /// by more than `tolerance`, worst first.
    pub fn check(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for (name, &value) in self.variables.iter().zip(values) {
            if value < -tolerance {
                violations.push(ConstraintViolation {
                    constraint: name.clone(),
                    required: 0.0,
                    actual: value,
                    violation_amount: -value,
                    description: format!("{} is negative ({:.6})", name, value),
                });
            }
        }

        for c in &self.constraints {
            let lhs = c.activity(values);

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + tolerance => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.6}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - tolerance => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.6}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > tolerance => {
                    let amt = (lhs - c.rhs).abs();
                    Some((amt, format!("{} requires exactly {:.2} but got {:.6}", c.name, c.rhs, lhs)))
                }
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}

impl Constraint {
    /// Left-hand side value at `values`
    pub fn activity(&self, values: &[f64]) -> f64 {
        dot(&self.coefficients, values)
    }

    /// Whether the constraint holds with equality at `values`
    pub fn is_binding(&self, values: &[f64], tolerance: f64) -> bool {
        (self.activity(values) - self.rhs).abs() <= tolerance
    }
}

fn dot(coefficients: &[f64], values: &[f64]) -> f64 {
    coefficients.iter().zip(values).map(|(c, v)| c * v).sum()
}
