//! # Terrain Generation
//!
//! Places the stronghold, forest clusters, mountain ranges and a river on a
//! player's world map.
//!
//! Generation is incremental: existing tiles are counted first and only the
//! shortfall against the level/quest targets is produced. Every candidate
//! coordinate is checked against a restricted set (existing tiles, unopened
//! chests, landmarks) that grows as tiles are accepted, so features never
//! overlap. Every retry loop is capped by [`TerrainConfig::max_attempts`].

use crate::config::{TerrainConfig, SOUTHWEST_LANDMARK, STRONGHOLD};
use crate::game::{PlayerId, Position, TerrainTile, TerrainType};
use crate::generation::utils::{feature_counts, placement_radius};
use crate::generation::{GenerationRequest, Generator};
use crate::{SquireError, SquireResult};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Scatter draws allowed per requested cluster point.
const SCATTER_DRAWS_PER_POINT: usize = 4;

/// Tiles added by one generation pass, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainReport {
    pub landmarks: usize,
    pub forests: usize,
    pub mountains: usize,
    pub river: usize,
}

impl TerrainReport {
    pub fn total(&self) -> usize {
        self.landmarks + self.forests + self.mountains + self.river
    }
}

/// New tiles to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerrainPlan {
    pub tiles: Vec<TerrainTile>,
    pub report: TerrainReport,
}

/// Accepted tiles plus the coordinates they may no longer use.
struct Placement {
    player_id: PlayerId,
    restricted: HashSet<Position>,
    tiles: Vec<TerrainTile>,
}

impl Placement {
    fn new(request: &GenerationRequest<'_>) -> Self {
        Self {
            player_id: request.player_id,
            restricted: request.restricted_positions(),
            tiles: Vec::new(),
        }
    }

    fn is_restricted(&self, position: Position) -> bool {
        self.restricted.contains(&position)
    }

    /// Accepts the tile if its coordinate is free.
    fn try_place(&mut self, position: Position, terrain: TerrainType) -> bool {
        if !self.restricted.insert(position) {
            return false;
        }
        self.tiles
            .push(TerrainTile::new(self.player_id, position, terrain));
        true
    }

    fn count(&self, terrain: TerrainType) -> usize {
        self.tiles.iter().filter(|tile| tile.terrain == terrain).count()
    }
}

/// World terrain generator.
#[derive(Debug, Clone, Default)]
pub struct TerrainGenerator {
    pub config: TerrainConfig,
}

impl TerrainGenerator {
    /// Creates a generator with the given tuning.
    ///
    /// # Examples
    ///
    /// ```
    /// use squire::{Generator, GenerationRequest, PlayerId, QuestId, TerrainConfig, TerrainGenerator};
    /// use squire::generation::utils::create_rng;
    ///
    /// let generator = TerrainGenerator::new(TerrainConfig::default());
    /// let request = GenerationRequest::fresh(PlayerId(1), QuestId(5), 1);
    /// let plan = generator.generate(&request, &mut create_rng(7)).unwrap();
    /// assert_eq!(plan.report.forests, 101);
    /// assert_eq!(plan.report.mountains, 71);
    /// ```
    pub fn new(config: TerrainConfig) -> Self {
        Self { config }
    }

    /// Stronghold, its forest halo and pinned clusters near the landmarks.
    fn place_landmarks(&self, placement: &mut Placement, forest_quota: usize, rng: &mut StdRng) {
        placement.tiles.push(TerrainTile::new(
            placement.player_id,
            STRONGHOLD,
            TerrainType::Stronghold,
        ));

        let halo = self.config.stronghold_halo_radius;
        for dy in -halo..=halo {
            for dx in -halo..=halo {
                if dx == 0 && dy == 0 {
                    continue;
                }
                placement.try_place(STRONGHOLD + Position::new(dx, dy), TerrainType::Forest);
            }
        }

        let pinned_jitter = halo + self.config.cluster_jitter;
        for anchor in [SOUTHWEST_LANDMARK, STRONGHOLD] {
            let remaining = forest_quota.saturating_sub(placement.count(TerrainType::Forest));
            let target = remaining.min(self.config.cluster_size as usize);
            self.scatter_forest(placement, anchor, pinned_jitter, target, rng);
        }
    }

    /// Scatters up to `target` forest tiles around `center`.
    fn scatter_forest(
        &self,
        placement: &mut Placement,
        center: Position,
        jitter: i32,
        target: usize,
        rng: &mut StdRng,
    ) -> usize {
        let mut placed = 0;
        for _ in 0..target * SCATTER_DRAWS_PER_POINT {
            if placed >= target {
                break;
            }
            let offset = Position::new(rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter));
            if placement.try_place(center + offset, TerrainType::Forest) {
                placed += 1;
            }
        }
        placed
    }

    fn random_position(radius: i32, rng: &mut StdRng) -> Position {
        Position::new(rng.gen_range(-radius..=radius), rng.gen_range(-radius..=radius))
    }

    fn place_forests(
        &self,
        placement: &mut Placement,
        needed: usize,
        radius: i32,
        rng: &mut StdRng,
    ) -> SquireResult<usize> {
        let mut placed = 0;
        let mut failures = 0;

        while placed < needed {
            if failures >= self.config.max_attempts {
                return Err(exhausted("forest", placed, needed));
            }

            let center = Self::random_position(radius, rng);
            if placement.is_restricted(center) {
                failures += 1;
                continue;
            }

            let target = (needed - placed).min(self.config.cluster_size as usize);
            let added = self.scatter_forest(placement, center, self.config.cluster_jitter, target, rng);
            if added == 0 {
                failures += 1;
            }
            placed += added;
        }

        Ok(placed)
    }

    fn place_mountains(
        &self,
        placement: &mut Placement,
        needed: usize,
        radius: i32,
        rng: &mut StdRng,
    ) -> SquireResult<usize> {
        let mut placed = 0;
        let mut failures = 0;

        while placed < needed {
            if failures >= self.config.max_attempts {
                return Err(exhausted("mountain", placed, needed));
            }

            let start = Self::random_position(radius, rng);
            if placement.is_restricted(start) {
                failures += 1;
                continue;
            }

            let step = if rng.gen_bool(0.5) {
                Position::new(1, 0)
            } else {
                Position::new(0, 1)
            };
            let mut added = 0;
            let mut cell = start;
            for _ in 0..self.config.mountain_range_length {
                if placed >= needed {
                    break;
                }
                if placement.try_place(cell, TerrainType::Mountain) {
                    placed += 1;
                    added += 1;
                }
                cell = cell + step;
            }
            if added == 0 {
                failures += 1;
            }
        }

        Ok(placed)
    }

    /// One step of the river walk: mostly eastward, bending on each axis with
    /// probability `river_bendiness`.
    fn river_step(&self, rng: &mut StdRng) -> Position {
        const BENDS: [i32; 3] = [-1, 0, 1];
        let dx = if rng.gen::<f64>() < self.config.river_bendiness {
            *BENDS.choose(rng).unwrap_or(&1)
        } else {
            1
        };
        let dy = if rng.gen::<f64>() < self.config.river_bendiness {
            *BENDS.choose(rng).unwrap_or(&0)
        } else {
            0
        };
        Position::new(dx, dy)
    }

    fn place_river(
        &self,
        placement: &mut Placement,
        level: u32,
        radius: i32,
        rng: &mut StdRng,
    ) -> SquireResult<usize> {
        let length = (self.config.river_base_length + self.config.river_length_per_level * level)
            as usize;
        if length == 0 {
            return Ok(0);
        }

        let mut attempts = 0;
        let mut current = loop {
            if attempts >= self.config.max_attempts {
                return Err(exhausted("river", 0, length));
            }
            attempts += 1;
            let start = Position::new(-radius, rng.gen_range(-radius..=radius));
            if placement.try_place(start, TerrainType::River) {
                break start;
            }
        };

        let mut placed = 1;
        while placed < length {
            let boxed_in = (-1..=1)
                .flat_map(|dx| (-1..=1).map(move |dy| Position::new(dx, dy)))
                .filter(|delta| *delta != Position::origin())
                .all(|delta| placement.is_restricted(current + delta));
            if boxed_in {
                warn!("River boxed in at {} after {} of {} cells", current, placed, length);
                break;
            }

            let mut attempts = 0;
            current = loop {
                if attempts >= self.config.max_attempts {
                    return Err(exhausted("river", placed, length));
                }
                attempts += 1;
                let next = current + self.river_step(rng);
                if placement.try_place(next, TerrainType::River) {
                    break next;
                }
            };
            placed += 1;
        }

        Ok(placed)
    }
}

fn exhausted(phase: &str, placed: usize, requested: usize) -> SquireError {
    warn!(
        "Terrain generation exhausted during {}: {} of {}",
        phase, placed, requested
    );
    SquireError::GenerationExhausted {
        phase: phase.to_string(),
        placed,
        requested,
    }
}

impl Generator<TerrainPlan> for TerrainGenerator {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        rng: &mut StdRng,
    ) -> SquireResult<TerrainPlan> {
        let counts = feature_counts(request.level, request.quest_id.0, &self.config);
        let radius = placement_radius(request.level, &self.config);

        let existing_of = |terrain: TerrainType| {
            request
                .existing_terrain
                .iter()
                .filter(|tile| tile.terrain == terrain)
                .count()
        };
        let existing_forests = existing_of(TerrainType::Forest);
        let existing_mountains = existing_of(TerrainType::Mountain);
        let has_river = existing_of(TerrainType::River) > 0;
        let has_stronghold = existing_of(TerrainType::Stronghold) > 0;

        let mut placement = Placement::new(request);
        let mut report = TerrainReport::default();

        if !has_stronghold {
            let quota = counts.trees.saturating_sub(existing_forests);
            self.place_landmarks(&mut placement, quota, rng);
            debug!("Placed {} landmark tiles", placement.tiles.len());
        }

        let forests_so_far = existing_forests + placement.count(TerrainType::Forest);
        let forests_needed = counts.trees.saturating_sub(forests_so_far);
        let clustered = self.place_forests(&mut placement, forests_needed, radius, rng)?;
        debug!("Placed {} clustered forest tiles", clustered);

        let mountains_needed = counts.mountains.saturating_sub(existing_mountains);
        report.mountains = self.place_mountains(&mut placement, mountains_needed, radius, rng)?;

        if !has_river {
            report.river = self.place_river(&mut placement, request.level, radius, rng)?;
        }

        // Halo and pinned forests count as forest, not landmark.
        report.forests = placement.count(TerrainType::Forest);
        report.landmarks = placement.count(TerrainType::Stronghold);

        debug!(
            "Terrain plan for player {}: {} forest, {} mountain, {} river, {} stronghold",
            request.player_id, report.forests, report.mountains, report.river, report.landmarks
        );

        Ok(TerrainPlan {
            tiles: placement.tiles,
            report,
        })
    }

    fn validate(&self, plan: &TerrainPlan, request: &GenerationRequest<'_>) -> SquireResult<()> {
        let restricted = request.restricted_positions();
        let mut seen = HashSet::new();

        for tile in &plan.tiles {
            if tile.player_id != request.player_id {
                return Err(SquireError::InvalidAction(format!(
                    "terrain tile at {} belongs to player {}",
                    tile.position, tile.player_id
                )));
            }
            if !seen.insert(tile.position) {
                return Err(SquireError::Conflict(format!(
                    "terrain plan places two tiles at {}",
                    tile.position
                )));
            }
            let is_stronghold = tile.terrain == TerrainType::Stronghold && tile.position == STRONGHOLD;
            if restricted.contains(&tile.position) && !is_stronghold {
                return Err(SquireError::Conflict(format!(
                    "terrain plan places {} on restricted cell {}",
                    tile.terrain, tile.position
                )));
            }
        }

        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "TerrainGenerator"
    }
}
