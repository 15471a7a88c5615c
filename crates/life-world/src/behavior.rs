//! Per-organism update: metabolism, cell actions, movement and reproduction.

use crate::grid::GridCell;
use crate::organism::Organism;
use crate::simulation::Simulation;
use crate::species::FossilArchive;
use life_anatomy::Anatomy;
use life_core::{CellType, Neighborhood, OrganismId, Position};
use rand::Rng;
use tracing::{debug, trace};

/// Result of one organism update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Handle was unknown or the organism had already died this tick
    Skipped,
    Alive,
    Died,
    Reproduced(OrganismId),
}

impl<A: FossilArchive> Simulation<A> {
    /// Advance a single organism by one tick.
    pub fn update_organism(&mut self, id: OrganismId) -> UpdateOutcome {
        let metabolic_cost = self.hyperparameters.metabolic_cost;
        let Some(organism) = self.organisms.get_mut(id) else {
            return UpdateOutcome::Skipped;
        };
        if organism.is_dead() {
            return UpdateOutcome::Skipped;
        }

        organism.age += 1;
        organism.energy -= metabolic_cost;
        if organism.should_die() {
            self.kill(id);
            return UpdateOutcome::Died;
        }

        self.perform_cell_functions(id);

        let ready = self
            .organisms
            .get(id)
            .is_some_and(|o| o.energy >= o.reproduction_cost(&self.hyperparameters));
        if ready {
            if let Some(child) = self.try_reproduce(id) {
                return UpdateOutcome::Reproduced(child);
            }
        }

        UpdateOutcome::Alive
    }

    fn perform_cell_functions(&mut self, id: OrganismId) {
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let Some(organism) = self.organisms.get(id) else {
            return;
        };

        let cells: Vec<(CellType, Position)> = organism
            .anatomy
            .cells()
            .iter()
            .map(|cell| {
                let pos = Organism::cell_position_at(organism.position, cell).wrap(cols, rows);
                (cell.cell_type(), pos)
            })
            .collect();
        let is_mover = organism.anatomy.is_mover();
        let can_produce = !is_mover || self.hyperparameters.movers_can_produce;

        for (cell_type, pos) in cells {
            match cell_type {
                CellType::Mouth => {
                    self.eat_near(id, pos);
                }
                CellType::Producer if can_produce => {
                    self.produce_near(pos);
                }
                CellType::Killer => self.attack_near(id, pos),
                CellType::Producer | CellType::Mover | CellType::Armor | CellType::Eye => {}
            }
        }

        if is_mover {
            self.try_move(id);
        }
    }

    /// Eat the first food found around a mouth cell.
    fn eat_near(&mut self, id: OrganismId, pos: Position) -> bool {
        let neighborhood = self.hyperparameters.edible_neighbors;
        let food = self
            .grid
            .neighbors(pos, neighborhood)
            .find(|(_, cell)| cell.is_food())
            .map(|(p, _)| p);

        let Some(food) = food else {
            return false;
        };
        self.grid.set(food, GridCell::Empty);
        if let Some(organism) = self.organisms.get_mut(id) {
            organism.energy += self.hyperparameters.food_energy;
            trace!(x = food.x, y = food.y, energy = organism.energy, "Ate food");
        }
        true
    }

    /// Occasionally grow food on the first empty neighbor of a producer cell.
    fn produce_near(&mut self, pos: Position) -> bool {
        if self.rng.gen::<f64>() >= self.hyperparameters.food_prod_prob {
            return false;
        }

        let neighborhood = self.hyperparameters.growable_neighbors;
        let spot = self
            .grid
            .neighbors(pos, neighborhood)
            .find(|(_, cell)| cell.is_empty())
            .map(|(p, _)| p);

        match spot {
            Some(spot) => {
                self.grid.set(spot, GridCell::Food);
                true
            }
            None => false,
        }
    }

    /// Damage every foreign organism cell around a killer cell.
    fn attack_near(&mut self, id: OrganismId, pos: Position) {
        let neighborhood = self.hyperparameters.killable_neighbors;
        let targets: Vec<OrganismId> = self
            .grid
            .neighbors(pos, neighborhood)
            .filter_map(|(_, cell)| cell.owner())
            .filter(|owner| *owner != id)
            .collect();

        for target in targets {
            let Some(victim) = self.organisms.get_mut(target) else {
                continue;
            };
            let damage = if self.hyperparameters.insta_kill {
                victim.health.max(1)
            } else {
                self.hyperparameters.kill_damage
            };
            victim.take_damage(damage);
            trace!(damage, health = victim.health, "Killer cell hit");
        }
    }

    /// Ask the policy for a direction and shift the whole body if the
    /// destination holds only empty space or the organism's own cells.
    pub(crate) fn try_move(&mut self, id: OrganismId) -> bool {
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let Some(organism) = self.organisms.get_mut(id) else {
            return false;
        };
        let Some(direction) = organism.policy_mut().decide_move(&mut self.rng) else {
            return false;
        };

        let (dx, dy) = direction.to_delta();
        let destination = organism.position.add(dx, dy).wrap(cols, rows);
        let grid = &self.grid;
        let clear = organism.anatomy.cells().iter().all(|cell| {
            match grid.get(Organism::cell_position_at(destination, cell)) {
                GridCell::Empty => true,
                GridCell::Organism { owner, .. } => owner == id,
                GridCell::Food => false,
            }
        });
        if !clear {
            return false;
        }

        for (_, pos) in organism.occupied_positions(cols, rows) {
            self.grid.set(pos, GridCell::Empty);
        }
        organism.position = destination;
        for (part, pos) in organism.occupied_positions(cols, rows) {
            self.grid.set(pos, GridCell::Organism { owner: id, part });
        }
        true
    }

    /// Pay the reproduction cost and place a (possibly mutated) copy on the
    /// first neighboring anchor where its whole body fits.
    pub(crate) fn try_reproduce(&mut self, id: OrganismId) -> Option<OrganismId> {
        if let Some(cap) = self.hyperparameters.population_cap() {
            if self.order.len() >= cap {
                trace!(cap, "Population cap reached");
                return None;
            }
        }
        self.reproduction_attempts += 1;

        let (anchor, cost, parent_species, mut child_anatomy, mut child_policy) = {
            let parent = self.organisms.get_mut(id)?;
            let cost = parent.reproduction_cost(&self.hyperparameters);
            parent.energy -= cost;
            (
                parent.position,
                cost,
                parent.species,
                Anatomy::from_cells(parent.anatomy.cells().iter().copied()),
                parent.policy().boxed_clone(),
            )
        };

        let mutation = self
            .mutator
            .maybe_mutate(&mut child_anatomy, child_policy.as_mut(), &mut self.rng);

        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let allow_food = !self.hyperparameters.food_blocks_reproduction;
        let slot = Neighborhood::All
            .offsets()
            .iter()
            .map(|(dx, dy)| anchor.add(*dx, *dy).wrap(cols, rows))
            .find(|candidate| self.fits(*candidate, &child_anatomy, allow_food));

        let Some(child_anchor) = slot else {
            self.reproduction_failures += 1;
            if self.hyperparameters.refund_failed_reproduction {
                if let Some(parent) = self.organisms.get_mut(id) {
                    parent.energy += cost;
                }
            }
            trace!(x = anchor.x, y = anchor.y, "No room for offspring");
            return None;
        };

        let species = match mutation {
            Some(_) => self
                .species
                .create(&child_anatomy, Some(parent_species), self.tick, &mut self.rng),
            None => {
                self.species.add_pop(parent_species);
                parent_species
            }
        };

        let child = Organism::new(
            child_anchor,
            child_anatomy,
            self.hyperparameters.initial_energy,
            species,
            self.tick,
            self.hyperparameters.lifespan_multiplier,
        )
        .with_policy(child_policy);
        let cells = child.cell_count();
        let child_id = self.insert(child);

        if let Some(parent) = self.organisms.get_mut(id) {
            parent.offspring_count += 1;
        }
        self.births += 1;

        debug!(
            event = "organism_born",
            x = child_anchor.x,
            y = child_anchor.y,
            cells,
            mutated = mutation.is_some(),
            tick = self.tick,
            "Offspring placed"
        );
        Some(child_id)
    }

    /// Turn every cell of the organism into food and flag it for removal.
    pub(crate) fn kill(&mut self, id: OrganismId) {
        let (cols, rows) = (self.grid.cols, self.grid.rows);
        let Some(organism) = self.organisms.get_mut(id) else {
            return;
        };
        if organism.is_dead() {
            return;
        }

        for (_, pos) in organism.occupied_positions(cols, rows) {
            debug_assert_eq!(self.grid.get(pos).owner(), Some(id));
            self.grid.set(pos, GridCell::Food);
        }
        organism.mark_dead();
        self.deaths += 1;

        debug!(
            event = "organism_died",
            age = organism.age,
            energy = organism.energy,
            cells = organism.cell_count(),
            tick = self.tick,
            "Organism died"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellKind;
    use crate::simulation::starter_anatomy;
    use life_anatomy::Heading;
    use life_core::{Direction, Hyperparameters, WorldConfig};

    fn quiet() -> Hyperparameters {
        Hyperparameters {
            food_spawn_prob: 0.0,
            food_prod_prob: 0.0,
            mutation_rate: 0.0,
            ..Default::default()
        }
    }

    fn sim(hp: Hyperparameters) -> Simulation {
        let world = WorldConfig {
            cols: 12,
            rows: 12,
            initial_organisms: 0,
            seed: 9,
        };
        Simulation::empty(world, hp).unwrap()
    }

    fn body(cells: &[(CellType, i32, i32)]) -> Anatomy {
        let mut anatomy = Anatomy::new();
        for (t, c, r) in cells {
            anatomy.add_default_cell(*t, *c, *r);
        }
        anatomy
    }

    /// Deterministic mover heading one way forever
    fn heading(direction: Direction) -> Box<Heading> {
        Box::new(Heading {
            heading: Some(direction),
            persistence: 1.0,
        })
    }

    #[test]
    fn test_metabolism_and_aging() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim.spawn(Position::new(5, 5), body(&[(CellType::Armor, 0, 0)])).unwrap();

        assert_eq!(sim.update_organism(id), UpdateOutcome::Alive);
        let organism = sim.organism(id).unwrap();
        assert_eq!(organism.age, 1);
        assert!((organism.energy - 4.99).abs() < 1e-9);
    }

    #[test]
    fn test_mouth_eats_first_food() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim.spawn(Position::new(5, 5), body(&[(CellType::Mouth, 0, 0)])).unwrap();
        sim.place_food(Position::new(6, 5));
        sim.place_food(Position::new(4, 4));

        sim.update_organism(id);

        // (-1, -1) is scanned before (1, 0)
        assert!(sim.grid().get(Position::new(4, 4)).is_empty());
        assert!(sim.grid().get(Position::new(6, 5)).is_food());
        let energy = sim.organism(id).unwrap().energy;
        assert!((energy - (5.0 - 0.01 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_adjacent_mouth_ignores_diagonals() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            edible_neighbors: Neighborhood::Adjacent,
            ..quiet()
        });
        let id = sim.spawn(Position::new(5, 5), body(&[(CellType::Mouth, 0, 0)])).unwrap();
        sim.place_food(Position::new(6, 6));

        sim.update_organism(id);
        assert!(sim.grid().get(Position::new(6, 6)).is_food());
    }

    #[test]
    fn test_producer_grows_food() {
        let mut sim = sim(Hyperparameters {
            food_prod_prob: 1.0,
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();

        sim.update_organism(id);
        assert!(sim.grid().get(Position::new(4, 4)).is_food());
        assert_eq!(sim.grid().count(CellKind::Food), 1);
    }

    #[test]
    fn test_movers_can_be_barred_from_producing() {
        let mut sim = sim(Hyperparameters {
            food_prod_prob: 1.0,
            reproduction_base_cost: 100.0,
            movers_can_produce: false,
            ..quiet()
        });
        sim.spawn(
            Position::new(5, 5),
            body(&[(CellType::Producer, 0, 0), (CellType::Mover, 0, 1)]),
        )
        .unwrap();

        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.grid().count(CellKind::Food), 0);
    }

    #[test]
    fn test_killer_damages_foreign_cells_only() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let hunter = sim
            .spawn(Position::new(5, 5), body(&[(CellType::Killer, 0, 0), (CellType::Mouth, 1, 0)]))
            .unwrap();
        let prey = sim
            .spawn(Position::new(4, 5), body(&[(CellType::Producer, 0, 0), (CellType::Producer, 0, 2)]))
            .unwrap();

        sim.update_organism(hunter);
        assert_eq!(sim.organism(hunter).unwrap().health, 2);
        assert_eq!(sim.organism(prey).unwrap().health, 1);
    }

    #[test]
    fn test_armor_blocks_killer() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let hunter = sim.spawn(Position::new(5, 5), body(&[(CellType::Killer, 0, 0)])).unwrap();
        let prey = sim.spawn(Position::new(6, 5), body(&[(CellType::Armor, 0, 0)])).unwrap();

        sim.update_organism(hunter);
        assert_eq!(sim.organism(prey).unwrap().health, 1);
    }

    #[test]
    fn test_damaged_organism_dies_on_its_own_update() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            insta_kill: true,
            ..quiet()
        });
        let prey = sim
            .spawn(Position::new(6, 5), body(&[(CellType::Mouth, 0, 0), (CellType::Producer, 1, 0)]))
            .unwrap();
        let hunter = sim.spawn(Position::new(5, 5), body(&[(CellType::Killer, 0, 0)])).unwrap();

        sim.update_organism(hunter);
        assert_eq!(sim.organism(prey).unwrap().health, 0);
        assert!(!sim.organism(prey).unwrap().is_dead());
        assert!(sim.grid().get(Position::new(6, 5)).owner().is_some());

        assert_eq!(sim.update_organism(prey), UpdateOutcome::Died);
        assert!(sim.grid().get(Position::new(6, 5)).is_food());
        assert!(sim.grid().get(Position::new(7, 5)).is_food());
        assert_eq!(sim.update_organism(prey), UpdateOutcome::Skipped);
    }

    #[test]
    fn test_mover_shifts_whole_body() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim
            .spawn_with_policy(Position::new(5, 5), starter_anatomy(), heading(Direction::East))
            .unwrap();

        assert!(sim.try_move(id));
        assert_eq!(sim.organism(id).unwrap().position, Position::new(6, 5));
        assert!(sim.grid().get(Position::new(5, 5)).is_empty());
        assert!(sim.grid().get(Position::new(5, 6)).is_empty());
        assert_eq!(sim.grid().get(Position::new(6, 5)).owner(), Some(id));
        assert_eq!(sim.grid().get(Position::new(6, 6)).part(), Some(1));
    }

    #[test]
    fn test_mover_can_step_into_own_cells() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim
            .spawn_with_policy(Position::new(5, 5), starter_anatomy(), heading(Direction::South))
            .unwrap();

        assert!(sim.try_move(id));
        assert_eq!(sim.organism(id).unwrap().position, Position::new(5, 6));
        assert_eq!(sim.grid().get(Position::new(5, 6)).part(), Some(0));
        assert_eq!(sim.grid().get(Position::new(5, 7)).part(), Some(1));
        assert!(sim.grid().get(Position::new(5, 5)).is_empty());
    }

    #[test]
    fn test_mover_blocked_by_food() {
        let mut sim = sim(Hyperparameters {
            reproduction_base_cost: 100.0,
            ..quiet()
        });
        let id = sim
            .spawn_with_policy(Position::new(5, 5), starter_anatomy(), heading(Direction::East))
            .unwrap();
        sim.place_food(Position::new(6, 6));

        assert!(!sim.try_move(id));
        assert_eq!(sim.organism(id).unwrap().position, Position::new(5, 5));
    }

    #[test]
    fn test_reproduction_places_child_first_free_neighbor() {
        let mut sim = sim(quiet());
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        sim.organism_mut(parent).unwrap().energy = 10.0;

        let outcome = sim.update_organism(parent);
        let UpdateOutcome::Reproduced(child) = outcome else {
            panic!("expected reproduction, got {:?}", outcome);
        };

        let child = sim.organism(child).unwrap();
        assert_eq!(child.position, Position::new(4, 4));
        assert_eq!(child.energy, 5.0);
        assert_eq!(child.birth_tick, 0);

        let parent_org = sim.organism(parent).unwrap();
        assert!((parent_org.energy - (10.0 - 0.01 - 6.0)).abs() < 1e-9);
        assert_eq!(parent_org.offspring_count, 1);
        assert_eq!(child.species, parent_org.species);
        assert_eq!(sim.species().get(child.species).unwrap().population, 2);
    }

    #[test]
    fn test_reproduction_blocked_forfeits_cost() {
        let mut sim = sim(quiet());
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        for (dx, dy) in Neighborhood::All.offsets() {
            sim.place_food(Position::new(5 + dx, 5 + dy));
        }
        sim.organism_mut(parent).unwrap().energy = 10.0;

        assert_eq!(sim.update_organism(parent), UpdateOutcome::Alive);
        let energy = sim.organism(parent).unwrap().energy;
        assert!((energy - (10.0 - 0.01 - 6.0)).abs() < 1e-9);
        assert_eq!(sim.organism_count(), 1);
    }

    #[test]
    fn test_reproduction_refund_when_enabled() {
        let mut sim = sim(Hyperparameters {
            refund_failed_reproduction: true,
            ..quiet()
        });
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        for (dx, dy) in Neighborhood::All.offsets() {
            sim.place_food(Position::new(5 + dx, 5 + dy));
        }
        sim.organism_mut(parent).unwrap().energy = 10.0;

        sim.update_organism(parent);
        let energy = sim.organism(parent).unwrap().energy;
        assert!((energy - 9.99).abs() < 1e-9);
    }

    #[test]
    fn test_reproduction_over_food_when_not_blocking() {
        let mut sim = sim(Hyperparameters {
            food_blocks_reproduction: false,
            ..quiet()
        });
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        for (dx, dy) in Neighborhood::All.offsets() {
            sim.place_food(Position::new(5 + dx, 5 + dy));
        }
        sim.organism_mut(parent).unwrap().energy = 10.0;

        assert!(matches!(sim.update_organism(parent), UpdateOutcome::Reproduced(_)));
        assert!(sim.grid().get(Position::new(4, 4)).owner().is_some());
    }

    #[test]
    fn test_population_cap() {
        let mut sim = sim(Hyperparameters {
            max_organisms: 1,
            ..quiet()
        });
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        sim.organism_mut(parent).unwrap().energy = 10.0;

        assert_eq!(sim.update_organism(parent), UpdateOutcome::Alive);
        assert!((sim.organism(parent).unwrap().energy - 9.99).abs() < 1e-9);
    }

    fn mutating(add: f64, change: f64, remove: f64) -> Hyperparameters {
        Hyperparameters {
            mutation_rate: 1.0,
            add_prob: add,
            change_prob: change,
            remove_prob: remove,
            ..quiet()
        }
    }

    #[test]
    fn test_mutated_child_founds_new_species() {
        let mut sim = sim(mutating(0.0, 1.0, 0.0));
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        sim.organism_mut(parent).unwrap().energy = 10.0;
        let parent_species = sim.organism(parent).unwrap().species;

        let outcome = sim.update_organism(parent);
        let UpdateOutcome::Reproduced(child) = outcome else {
            panic!("expected reproduction, got {:?}", outcome);
        };

        let child = sim.organism(child).unwrap();
        assert_eq!(child.position, Position::new(4, 4));
        assert_ne!(child.species, parent_species);
        let founded = sim.species().get(child.species).unwrap();
        assert_eq!(founded.ancestor, Some(parent_species));
        assert_eq!(founded.population, 1);
        assert_eq!(sim.species().get(parent_species).unwrap().population, 1);
        assert_eq!(sim.species().active_count(), 2);
    }

    #[test]
    fn test_no_op_mutation_still_founds_new_species() {
        // a single cell cannot lose its anchor, so the removal changes nothing
        let mut sim = sim(mutating(0.0, 0.0, 1.0));
        let parent = sim.spawn(Position::new(5, 5), body(&[(CellType::Producer, 0, 0)])).unwrap();
        sim.organism_mut(parent).unwrap().energy = 10.0;
        let parent_species = sim.organism(parent).unwrap().species;

        let outcome = sim.update_organism(parent);
        let UpdateOutcome::Reproduced(child) = outcome else {
            panic!("expected reproduction, got {:?}", outcome);
        };

        let child = sim.organism(child).unwrap();
        assert_eq!(child.anatomy, sim.organism(parent).unwrap().anatomy);
        assert_ne!(child.species, parent_species);
        let founded = sim.species().get(child.species).unwrap();
        assert_eq!(founded.ancestor, Some(parent_species));
        assert_eq!(founded.population, 1);
        assert_eq!(sim.species().get(parent_species).unwrap().population, 1);
    }
}
