//! Block-sparse operator storage.
//!
//! Two flavors back the assembly contract: [`FaceBsr`] keeps the two
//! off-diagonal blocks of every interior face in face order, which is how
//! the assembler naturally produces them; [`GeneralBsr`] keeps per-row
//! block maps keyed by column.

use std::collections::BTreeMap;

use afv_physics::{Block, State};
use afv_spatial::{Apply, LinearOperator, StorageKind, SubmitSlot};
use rayon::prelude::*;

/// Block-sparse matrix whose off-diagonal blocks are addressed by
/// interior-face index ("d" storage).
pub struct FaceBsr {
    n_cells: usize,
    /// Interior-face ordinal -> (left, right) cells.
    faces: Vec<(usize, usize)>,
    diag: Vec<Block>,
    /// Per face, the (right, left) block.
    lower: Vec<Block>,
    /// Per face, the (left, right) block.
    upper: Vec<Block>,
}

impl FaceBsr {
    pub fn new(n_cells: usize, faces: Vec<(usize, usize)>) -> Self {
        let nf = faces.len();
        Self {
            n_cells,
            faces,
            diag: vec![Block::zeros(); n_cells],
            lower: vec![Block::zeros(); nf],
            upper: vec![Block::zeros(); nf],
        }
    }
}

impl Apply for FaceBsr {
    fn apply(&self, x: &[State], y: &mut [State]) {
        y.par_iter_mut()
            .enumerate()
            .for_each(|(i, yi)| *yi = self.diag[i] * x[i]);
        for (k, &(l, r)) in self.faces.iter().enumerate() {
            y[l] += self.upper[k] * x[r];
            y[r] += self.lower[k] * x[l];
        }
    }
}

impl LinearOperator for FaceBsr {
    fn storage(&self) -> StorageKind {
        StorageKind::FaceIndexed
    }

    fn n_cells(&self) -> usize {
        self.n_cells
    }

    fn reset(&mut self) {
        self.diag.fill(Block::zeros());
        self.lower.fill(Block::zeros());
        self.upper.fill(Block::zeros());
    }

    fn update_diag_block(&mut self, cell: usize, add: &Block) {
        self.diag[cell] += add;
    }

    fn submit_block(&mut self, row: usize, col: usize, add: &Block, slot: SubmitSlot) {
        match slot {
            SubmitSlot::FaceUpper(k) => {
                debug_assert_eq!((row, col), (self.faces[k].0, self.faces[k].1));
                self.upper[k] += add;
            }
            SubmitSlot::FaceLower(k) => {
                debug_assert_eq!((row, col), (self.faces[k].1, self.faces[k].0));
                self.lower[k] += add;
            }
            SubmitSlot::Pair => {
                panic!("face-indexed storage needs face-indexed submission")
            }
        }
    }

    fn diag_blocks(&self) -> Vec<Block> {
        self.diag.clone()
    }
}

/// Block-sparse matrix with per-row column maps.
pub struct GeneralBsr {
    diag: Vec<Block>,
    rows: Vec<BTreeMap<usize, Block>>,
}

impl GeneralBsr {
    pub fn new(n_cells: usize) -> Self {
        Self {
            diag: vec![Block::zeros(); n_cells],
            rows: vec![BTreeMap::new(); n_cells],
        }
    }
}

impl Apply for GeneralBsr {
    fn apply(&self, x: &[State], y: &mut [State]) {
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let mut acc = self.diag[i] * x[i];
            for (&col, block) in &self.rows[i] {
                acc += block * x[col];
            }
            *yi = acc;
        });
    }
}

impl LinearOperator for GeneralBsr {
    fn storage(&self) -> StorageKind {
        StorageKind::General
    }

    fn n_cells(&self) -> usize {
        self.diag.len()
    }

    fn reset(&mut self) {
        self.diag.fill(Block::zeros());
        for row in &mut self.rows {
            row.clear();
        }
    }

    fn update_diag_block(&mut self, cell: usize, add: &Block) {
        self.diag[cell] += add;
    }

    fn submit_block(&mut self, row: usize, col: usize, add: &Block, _slot: SubmitSlot) {
        *self.rows[row].entry(col).or_insert_with(Block::zeros) += add;
    }

    fn diag_blocks(&self) -> Vec<Block> {
        self.diag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cell_fixture() -> (Block, Block, Block, Block) {
        let d0 = 2.0 * Block::identity();
        let d1 = 3.0 * Block::identity();
        let mut upper = Block::zeros();
        upper[(0, 0)] = 1.0;
        let mut lower = Block::zeros();
        lower[(3, 3)] = -1.0;
        (d0, d1, upper, lower)
    }

    fn check_apply(op: &dyn LinearOperator) {
        let x = vec![State::new(1.0, 2.0, 3.0, 4.0), State::new(-1.0, 0.5, 0.0, 2.0)];
        let mut y = vec![State::zeros(); 2];
        op.apply(&x, &mut y);
        // Row 0: 2 x0 + upper x1 (only first component of x1).
        assert_eq!(y[0], State::new(2.0 - 1.0, 4.0, 6.0, 8.0));
        // Row 1: 3 x1 + lower x0 (minus last component of x0).
        assert_eq!(y[1], State::new(-3.0, 1.5, 0.0, 6.0 - 4.0));
    }

    #[test]
    fn face_bsr_applies_blocks() {
        let (d0, d1, upper, lower) = two_cell_fixture();
        let mut op = FaceBsr::new(2, vec![(0, 1)]);
        op.update_diag_block(0, &d0);
        op.update_diag_block(1, &d1);
        op.submit_block(0, 1, &upper, SubmitSlot::FaceUpper(0));
        op.submit_block(1, 0, &lower, SubmitSlot::FaceLower(0));
        check_apply(&op);

        op.reset();
        let x = vec![State::from_element(1.0); 2];
        let mut y = vec![State::from_element(9.0); 2];
        op.apply(&x, &mut y);
        assert!(y.iter().all(|yi| *yi == State::zeros()));
    }

    #[test]
    fn general_bsr_applies_blocks() {
        let (d0, d1, upper, lower) = two_cell_fixture();
        let mut op = GeneralBsr::new(2);
        op.update_diag_block(0, &d0);
        op.update_diag_block(1, &d1);
        op.submit_block(0, 1, &upper, SubmitSlot::Pair);
        op.submit_block(1, 0, &lower, SubmitSlot::Pair);
        check_apply(&op);
    }

    #[test]
    fn submissions_accumulate() {
        let mut op = GeneralBsr::new(2);
        op.submit_block(0, 1, &Block::identity(), SubmitSlot::Pair);
        op.submit_block(0, 1, &Block::identity(), SubmitSlot::Pair);
        let x = vec![State::zeros(), State::from_element(1.0)];
        let mut y = vec![State::zeros(); 2];
        op.apply(&x, &mut y);
        assert_eq!(y[0], State::from_element(2.0));
    }
}
