//! Path-dependent TreeSHAP.
//!
//! Computes exact Shapley values for a single tree in polynomial time by
//! tracking, along each root-to-leaf path, the proportion of all feature
//! subsets that would reach the current node. Missing features follow both
//! children weighted by training cover, so no background dataset is needed.
//!
//! Reference: Lundberg, Erion & Lee, "Consistent Individualized Feature
//! Attribution for Tree Ensembles" (Algorithm 2).

use super::model::{Node, Tree};
use ndarray::ArrayView1;

/// One entry of the unique feature path leading to the current node.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` for the sentinel element at the root.
    feature: Option<usize>,
    /// Fraction of cover that flows down this path when the feature is unknown.
    zero_fraction: f64,
    /// 1.0 if `x` follows this path when the feature is known, else 0.0.
    one_fraction: f64,
    /// Proportion of subsets of the given size that reach this point.
    pweight: f64,
}

/// Adds `scale` times the Shapley values of `tree` at `x` into `phi`.
pub(crate) fn accumulate_tree_shap(tree: &Tree, x: ArrayView1<f64>, scale: f64, phi: &mut [f64]) {
    let mut walker = Walker { tree, x, scale, phi };
    walker.recurse(0, Vec::new(), 1.0, 1.0, None);
}

struct Walker<'a, 'x> {
    tree: &'a Tree,
    x: ArrayView1<'x, f64>,
    scale: f64,
    phi: &'a mut [f64],
}

impl Walker<'_, '_> {
    fn recurse(
        &mut self,
        index: usize,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        let node = self.tree.nodes[index];
        match node {
            Node::Leaf { value, .. } => {
                for position in 1..path.len() {
                    let element = path[position];
                    let weight = unwound_path_sum(&path, position);
                    if let Some(feature) = element.feature {
                        self.phi[feature] += weight
                            * (element.one_fraction - element.zero_fraction)
                            * value
                            * self.scale;
                    }
                }
            }
            Node::Split {
                feature: split,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = if self.x[split] <= threshold {
                    (left, right)
                } else {
                    (right, left)
                };
                let hot_zero_fraction = self.tree.nodes[hot].cover() / cover;
                let cold_zero_fraction = self.tree.nodes[cold].cover() / cover;

                // A feature seen earlier on the path is undone so this split
                // can redo it with the combined fractions.
                let mut incoming_zero_fraction = 1.0;
                let mut incoming_one_fraction = 1.0;
                if let Some(previous) = path.iter().position(|e| e.feature == Some(split)) {
                    incoming_zero_fraction = path[previous].zero_fraction;
                    incoming_one_fraction = path[previous].one_fraction;
                    unwind_path(&mut path, previous);
                }

                self.recurse(
                    hot,
                    path.clone(),
                    hot_zero_fraction * incoming_zero_fraction,
                    incoming_one_fraction,
                    Some(split),
                );
                self.recurse(
                    cold,
                    path,
                    cold_zero_fraction * incoming_zero_fraction,
                    0.0,
                    Some(split),
                );
            }
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denominator = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denominator;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denominator;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, position: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let denominator = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let stored = path[i].pweight;
            path[i].pweight = next_one_portion * denominator / ((i + 1) as f64 * one_fraction);
            next_one_portion =
                stored - path[i].pweight * zero_fraction * (depth - i) as f64 / denominator;
        } else {
            path[i].pweight = path[i].pweight * denominator / (zero_fraction * (depth - i) as f64);
        }
    }

    // Weights stay in place; only the identities shift down over the removed slot.
    for i in position..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.truncate(depth);
}

/// Total path weight with element `position` removed, without mutating the path.
fn unwound_path_sum(path: &[PathElement], position: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[position].one_fraction;
    let zero_fraction = path[position].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    if one_fraction != 0.0 {
        for i in (0..depth).rev() {
            let share = next_one_portion / ((i + 1) as f64 * one_fraction);
            total += share;
            next_one_portion = path[i].pweight - share * zero_fraction * (depth - i) as f64;
        }
    } else {
        for i in (0..depth).rev() {
            total += path[i].pweight / (zero_fraction * (depth - i) as f64);
        }
    }

    total * (depth + 1) as f64
}
