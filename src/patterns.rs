//! Initial-configuration seeders. All of them write through the cell
//! accessor before the first generation and leave the outer dead frame
//! untouched.

use rand::RngCore;

use crate::engine::Simulation;
use crate::error::Error;

/// Tile the interior with 2x2 still-life blocks on a 4-cell pitch.
/// Converges at generation 1 under every strategy.
pub fn stable_blocks(sim: &mut Simulation) {
    let dim = sim.dim();
    let mut y = 1;
    while y < dim - 2 {
        let mut x = 1;
        while x < dim - 2 {
            sim.set_cell(x, y, true);
            sim.set_cell(x + 1, y, true);
            sim.set_cell(x, y + 1, true);
            sim.set_cell(x + 1, y + 1, true);
            x += 4;
        }
        y += 4;
    }
}

/// Tile the interior with period-2 blinkers, alternating horizontal and
/// vertical so neighboring blinkers never interact.
pub fn oscillators(sim: &mut Simulation) {
    let dim = sim.dim();
    let mut y = 2;
    while y + 4 < dim {
        let mut x = 2;
        while x + 4 < dim {
            if (x - 2) % 8 != 0 {
                sim.set_cell(x, y + 1, true);
                sim.set_cell(x + 1, y + 1, true);
                sim.set_cell(x + 2, y + 1, true);
            } else {
                sim.set_cell(x + 1, y, true);
                sim.set_cell(x + 1, y + 1, true);
                sim.set_cell(x + 1, y + 2, true);
            }
            x += 4;
        }
        y += 4;
    }
}

/// Fill the interior with random cells at the given alive density.
pub fn random(sim: &mut Simulation, density: f64, rng: &mut impl RngCore) {
    let dim = sim.dim();
    // Inclusive compare so a density of 1.0 fills every interior cell.
    let threshold = (density.clamp(0.0, 1.0) * u64::MAX as f64) as u64;
    for y in 1..dim - 1 {
        for x in 1..dim - 1 {
            if rng.next_u64() <= threshold {
                sim.set_cell(x, y, true);
            }
        }
    }
}

/// Place a single south-east-bound glider with its bounding box corner at
/// `(x, y)`.
pub fn glider(sim: &mut Simulation, x: usize, y: usize) {
    for &(dx, dy) in &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
        sim.set_cell(x + dx, y + dy, true);
    }
}

const GOSPER_GUN: [(usize, usize); 36] = [
    (0, 4), (0, 5), (1, 4), (1, 5),
    (10, 4), (10, 5), (10, 6), (11, 3), (11, 7), (12, 2), (12, 8),
    (13, 2), (13, 8), (14, 5), (15, 3), (15, 7), (16, 4), (16, 5),
    (16, 6), (17, 5),
    (20, 2), (20, 3), (20, 4), (21, 2), (21, 3), (21, 4), (22, 1),
    (22, 5), (24, 0), (24, 1), (24, 5), (24, 6),
    (34, 2), (34, 3), (35, 2), (35, 3),
];

/// Bounding box of the Gosper gun pattern itself (not its glider stream).
pub const GOSPER_GUN_W: usize = 36;
pub const GOSPER_GUN_H: usize = 9;

/// Place a Gosper glider gun with its bounding box corner at `(x, y)`.
/// Fails if the gun would touch the dead frame.
pub fn gosper_gun(sim: &mut Simulation, x: usize, y: usize) -> Result<(), Error> {
    let dim = sim.dim();
    let required = (x + GOSPER_GUN_W + 1).max(y + GOSPER_GUN_H + 1);
    if x == 0 || y == 0 || required > dim {
        return Err(Error::GridTooSmall { required, actual: dim });
    }
    for &(dx, dy) in &GOSPER_GUN {
        sim.set_cell(x + dx, y + dy, true);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Simulation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stable_blocks_population() {
        let mut sim = Simulation::new(16, 8, 8).unwrap();
        stable_blocks(&mut sim);
        // x and y each take values 1, 5, 9 before hitting dim - 2 = 14.
        assert_eq!(sim.population(), 4 * 4 * 4);
    }

    #[test]
    fn oscillators_are_three_cell_rows_or_columns() {
        let mut sim = Simulation::new(32, 8, 8).unwrap();
        oscillators(&mut sim);
        assert_eq!(sim.population() % 3, 0);
        assert!(sim.population() > 0);
    }

    #[test]
    fn random_density_is_roughly_honored() {
        let mut sim = Simulation::new(128, 16, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        random(&mut sim, 0.25, &mut rng);
        let interior = 126u64 * 126;
        let pop = sim.population();
        assert!(pop > interior / 5, "population {pop} too sparse");
        assert!(pop < interior * 3 / 10, "population {pop} too dense");
    }

    #[test]
    fn full_density_fills_the_interior() {
        let mut sim = Simulation::new(32, 8, 8).unwrap();
        random(&mut sim, 1.0, &mut StdRng::seed_from_u64(0));
        assert_eq!(sim.population(), 30 * 30);
    }

    #[test]
    fn random_is_deterministic_per_seed() {
        let mut a = Simulation::new(64, 16, 16).unwrap();
        let mut b = Simulation::new(64, 16, 16).unwrap();
        random(&mut a, 0.5, &mut StdRng::seed_from_u64(7));
        random(&mut b, 0.5, &mut StdRng::seed_from_u64(7));
        assert_eq!(a.cells(), b.cells());
    }

    #[test]
    fn glider_has_five_cells() {
        let mut sim = Simulation::new(32, 8, 8).unwrap();
        glider(&mut sim, 4, 4);
        assert_eq!(sim.population(), 5);
    }

    #[test]
    fn gosper_gun_rejects_small_grids() {
        let mut sim = Simulation::new(32, 8, 8).unwrap();
        assert!(matches!(
            gosper_gun(&mut sim, 1, 1),
            Err(Error::GridTooSmall { .. })
        ));

        let mut sim = Simulation::new(64, 8, 8).unwrap();
        gosper_gun(&mut sim, 1, 1).unwrap();
        assert_eq!(sim.population(), 36);
    }
}
