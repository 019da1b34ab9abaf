use log::{debug, trace};

use crate::backend::LpSolver;
use crate::error::SolverError;
use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::Solution;

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const BLAND_AFTER: usize = 50;

/// Two-phase tableau simplex solver for linear programming problems
pub struct Solver {
    /// Maximum pivots (both phases together) before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl LpSolver for Solver {
    fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        Solver::solve(self, problem)
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, SolverError> {
        validate(problem)?;

        let mut tableau = Tableau::new(problem);
        // Feasibility is judged relative to the problem's scale
        let feasibility_tol = self.tolerance * (1.0 + tableau.max_rhs());
        let mut iterations = 0;

        debug!(
            "simplex: {} variables, {} constraints ({} slack, {} artificial)",
            tableau.n_vars,
            tableau.rows.len(),
            tableau.n_slack,
            tableau.n_artificial
        );

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            tableau.load_phase1_objective();
            let enter_limit = tableau.rhs_col();
            match self.run(&mut tableau, enter_limit, &mut iterations) {
                PhaseResult::Optimal => {}
                // Phase 1 is bounded below by zero; treat anything else as infeasible
                PhaseResult::Unbounded => return Ok(Solution::infeasible(iterations)),
                PhaseResult::IterationLimit => return Ok(Solution::iteration_limit(iterations)),
            }

            let residual = tableau.artificial_residual();
            if residual > feasibility_tol {
                debug!("simplex: infeasible, artificial residual {:e} after {} pivots", residual, iterations);
                return Ok(Solution::infeasible(iterations));
            }
            tableau.drive_out_artificials(self.tolerance);
        }

        // Phase 2: Optimize, never letting an artificial back in
        tableau.load_objective(problem);
        let enter_limit = tableau.artificial_start();
        match self.run(&mut tableau, enter_limit, &mut iterations) {
            PhaseResult::Optimal => {}
            PhaseResult::Unbounded => return Ok(Solution::unbounded(iterations)),
            PhaseResult::IterationLimit => return Ok(Solution::iteration_limit(iterations)),
        }

        debug!("simplex: optimal after {} pivots", iterations);
        Ok(self.extract_solution(&tableau, problem, feasibility_tol, iterations))
    }

    fn run(&self, tableau: &mut Tableau, enter_limit: usize, iterations: &mut usize) -> PhaseResult {
        let mut degenerate_streak = 0;

        loop {
            let rule = if degenerate_streak > BLAND_AFTER {
                PivotRule::Bland
            } else {
                PivotRule::Dantzig
            };
            let Some(pivot_col) = tableau.entering_column(enter_limit, rule, self.tolerance) else {
                return PhaseResult::Optimal;
            };
            if *iterations >= self.max_iterations {
                return PhaseResult::IterationLimit;
            }
            let Some(pivot_row) = tableau.leaving_row(pivot_col, self.tolerance) else {
                return PhaseResult::Unbounded;
            };

            if tableau.rows[pivot_row][tableau.rhs_col()] <= self.tolerance {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }

            trace!("pivot {}: row {} col {} ({:?})", iterations, pivot_row, pivot_col, rule);
            tableau.pivot(pivot_row, pivot_col);
            *iterations += 1;
        }
    }

    fn extract_solution(
        &self,
        tableau: &Tableau,
        problem: &LpProblem,
        feasibility_tol: f64,
        iterations: usize,
    ) -> Solution {
        let rhs_col = tableau.rhs_col();

        let mut values = vec![0.0; problem.num_variables()];
        for (row, &basic) in tableau.rows.iter().zip(&tableau.basis) {
            if basic < tableau.n_vars {
                // Basic values are non-negative up to round-off
                values[basic] = row[rhs_col].max(0.0);
            }
        }

        // Objective from the values themselves so it reconciles exactly
        let objective_value = problem.objective_value(&values);

        let binding_constraints = problem
            .constraints
            .iter()
            .filter(|c| c.is_binding(&values, feasibility_tol))
            .map(|c| c.name.clone())
            .collect();

        Solution::optimal(values, objective_value, binding_constraints, iterations)
    }
}

fn validate(problem: &LpProblem) -> Result<(), SolverError> {
    let n = problem.num_variables();

    if problem.objective.coefficients.len() != n {
        return Err(SolverError::ObjectiveDimension {
            expected: n,
            found: problem.objective.coefficients.len(),
        });
    }
    if problem.objective.coefficients.iter().any(|c| !c.is_finite()) {
        return Err(SolverError::NonFinite("objective".to_string()));
    }

    for c in &problem.constraints {
        if c.coefficients.len() != n {
            return Err(SolverError::ConstraintDimension {
                name: c.name.clone(),
                expected: n,
                found: c.coefficients.len(),
            });
        }
        if !c.rhs.is_finite() || c.coefficients.iter().any(|a| !a.is_finite()) {
            return Err(SolverError::NonFinite(c.name.clone()));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum PivotRule {
    /// Most improving reduced cost
    Dantzig,
    /// Lowest improving index, guarantees termination on degenerate problems
    Bland,
}

enum PhaseResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// Dense tableau. Columns: structural, slack/surplus, artificial, rhs.
/// The objective row stores reduced costs in maximization form; a positive
/// entry means the column improves the objective.
struct Tableau {
    rows: Vec<Vec<f64>>,
    objective: Vec<f64>,
    basis: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn new(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();

        // Keep every rhs non-negative; negating a row mirrors its operator
        let normalized: Vec<(Vec<f64>, ConstraintOp, f64)> = problem
            .constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    let coefficients = c.coefficients.iter().map(|a| -a).collect();
                    (coefficients, mirrored(c.op), -c.rhs)
                } else {
                    (c.coefficients.clone(), c.op, c.rhs)
                }
            })
            .collect();

        let mut n_slack = 0;
        let mut n_artificial = 0;
        for (_, op, _) in &normalized {
            match op {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1;
        let mut rows = vec![vec![0.0; total_cols]; normalized.len()];
        let mut basis = vec![0; normalized.len()];

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (coefficients, op, rhs)) in normalized.into_iter().enumerate() {
            let row = &mut rows[i];
            row[..n_vars].copy_from_slice(&coefficients);
            row[total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    row[slack_idx] = 1.0;
                    basis[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    row[slack_idx] = -1.0;
                    slack_idx += 1;
                    row[artificial_idx] = 1.0;
                    basis[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    row[artificial_idx] = 1.0;
                    basis[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        Self {
            rows,
            objective: vec![0.0; total_cols],
            basis,
            n_vars,
            n_slack,
            n_artificial,
        }
    }

    fn rhs_col(&self) -> usize {
        self.objective.len() - 1
    }

    fn artificial_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn max_rhs(&self) -> f64 {
        let rhs_col = self.rhs_col();
        self.rows.iter().map(|r| r[rhs_col].abs()).fold(0.0, f64::max)
    }

    /// Maximize the negated sum of artificials
    fn load_phase1_objective(&mut self) {
        let art_start = self.artificial_start();
        let rhs_col = self.rhs_col();

        self.objective.iter_mut().for_each(|v| *v = 0.0);
        for v in &mut self.objective[art_start..rhs_col] {
            *v = -1.0;
        }
        // Price out the artificials that start in the basis
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            if basic >= art_start {
                for (o, a) in self.objective.iter_mut().zip(row) {
                    *o += a;
                }
            }
        }
    }

    fn load_objective(&mut self, problem: &LpProblem) {
        self.objective.iter_mut().for_each(|v| *v = 0.0);
        for (o, &c) in self.objective.iter_mut().zip(&problem.objective.coefficients) {
            *o = if problem.objective.minimize { -c } else { c };
        }

        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            let ratio = self.objective[basic];
            if ratio != 0.0 {
                for (o, a) in self.objective.iter_mut().zip(row) {
                    *o -= ratio * a;
                }
            }
        }
    }

    fn artificial_residual(&self) -> f64 {
        let art_start = self.artificial_start();
        let rhs_col = self.rhs_col();
        self.rows
            .iter()
            .zip(&self.basis)
            .filter(|&(_, &basic)| basic >= art_start)
            .map(|(row, _)| row[rhs_col].abs())
            .sum()
    }

    /// Pivot zero-valued artificials out of the basis. A row with no
    /// structural or slack entry left is a redundant equality and is dropped.
    fn drive_out_artificials(&mut self, tol: f64) {
        let art_start = self.artificial_start();
        let rhs_col = self.rhs_col();

        let mut i = 0;
        while i < self.rows.len() {
            if self.basis[i] < art_start {
                i += 1;
                continue;
            }
            self.rows[i][rhs_col] = 0.0;
            match (0..art_start).find(|&j| self.rows[i][j].abs() > tol) {
                Some(col) => {
                    self.pivot(i, col);
                    i += 1;
                }
                None => {
                    trace!("dropping redundant row {}", i);
                    self.rows.remove(i);
                    self.basis.remove(i);
                }
            }
        }
    }

    fn entering_column(&self, limit: usize, rule: PivotRule, tol: f64) -> Option<usize> {
        let candidates = self.objective[..limit].iter().enumerate().filter(|&(_, &r)| r > tol);

        match rule {
            PivotRule::Bland => candidates.map(|(j, _)| j).next(),
            PivotRule::Dantzig => candidates
                .fold(None, |best: Option<(usize, f64)>, (j, &r)| match best {
                    Some((_, best_r)) if best_r >= r => best,
                    _ => Some((j, r)),
                })
                .map(|(j, _)| j),
        }
    }

    /// Minimum ratio test; ties go to the lowest basic variable index
    fn leaving_row(&self, col: usize, tol: f64) -> Option<usize> {
        let rhs_col = self.rhs_col();
        let mut best: Option<(usize, f64)> = None;

        for (i, row) in self.rows.iter().enumerate() {
            let a = row[col];
            if a <= tol {
                continue;
            }
            let ratio = row[rhs_col].max(0.0) / a;
            let better = match best {
                None => true,
                Some((r, best_ratio)) => {
                    ratio < best_ratio - tol
                        || ((ratio - best_ratio).abs() <= tol && self.basis[i] < self.basis[r])
                }
            };
            if better {
                best = Some((i, ratio));
            }
        }

        best.map(|(i, _)| i)
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basis[row] = col;

        let pivot_val = self.rows[row][col];
        for v in &mut self.rows[row] {
            *v /= pivot_val;
        }

        let pivot_row = self.rows[row].clone();
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor != 0.0 {
                for (v, p) in other.iter_mut().zip(&pivot_row) {
                    *v -= factor * p;
                }
            }
        }

        let factor = self.objective[col];
        if factor != 0.0 {
            for (v, p) in self.objective.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
        }
    }
}

fn mirrored(op: ConstraintOp) -> ConstraintOp {
    match op {
        ConstraintOp::Le => ConstraintOp::Ge,
        ConstraintOp::Ge => ConstraintOp::Le,
        ConstraintOp::Eq => ConstraintOp::Eq,
    }
}
