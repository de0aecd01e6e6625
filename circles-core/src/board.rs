//! Hex board geometry and occupancy with axial coordinates

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::entities::{Placeable, Slot, SlotKind};
use crate::error::BoardError;

/// Default board radius (hexes strictly closer than this to the center exist)
pub const DEFAULT_RADIUS: i32 = 6;

/// Chance for an empty hex to receive an obstacle on round setup
pub const OBSTACLE_CHANCE: f64 = 0.15;

/// Direction vectors in axial coordinates (dq, dr)
pub const DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
];

// ============================================================================
// HEX
// ============================================================================

/// Axial hex coordinates, identified on the wire as `"q;r"`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube x
    pub const fn x(&self) -> i32 {
        self.q
    }

    /// Cube y
    pub const fn y(&self) -> i32 {
        -self.q - self.r
    }

    /// Cube z
    pub const fn z(&self) -> i32 {
        self.r
    }

    /// Chebyshev distance in cube coordinates
    pub fn distance_to(&self, other: Hex) -> i32 {
        (self.x() - other.x())
            .abs()
            .max((self.y() - other.y()).abs())
            .max((self.z() - other.z()).abs())
    }

    /// Distance from center (0,0)
    pub fn distance_from_center(&self) -> i32 {
        self.distance_to(Hex::new(0, 0))
    }

    pub const fn offset(&self, dq: i32, dr: i32) -> Hex {
        Hex::new(self.q + dq, self.r + dr)
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: usize) -> Hex {
        let (dq, dr) = DIRECTIONS[direction % 6];
        self.offset(dq, dr)
    }

    /// Unit step from `self` toward `other`, if both share one of the six
    /// axes. `None` for the same hex or an off-axis target.
    pub fn direction_to(&self, other: Hex) -> Option<(i32, i32)> {
        let (dq, dr) = (other.q - self.q, other.r - self.r);
        let distance = self.distance_to(other);
        if distance == 0 || !(dq == 0 || dr == 0 || dq == -dr) {
            return None;
        }
        Some((dq / distance, dr / distance))
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.q, self.r)
    }
}

impl FromStr for Hex {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BoardError::InvalidHexId(s.to_string());
        let (q, r) = s.split_once(';').ok_or_else(invalid)?;
        let q = q.trim().parse().map_err(|_| invalid())?;
        let r = r.trim().parse().map_err(|_| invalid())?;
        Ok(Hex::new(q, r))
    }
}

impl From<Hex> for String {
    fn from(hex: Hex) -> Self {
        hex.to_string()
    }
}

impl TryFrom<String> for Hex {
    type Error = BoardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// FILTERS
// ============================================================================

/// Occupant filter for range queries. Only one list is supplied per query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotFilter<'a> {
    Any,
    /// Keep only hexes whose occupant kind is listed
    Allowed(&'a [SlotKind]),
    /// Drop hexes whose occupant kind is listed
    Restricted(&'a [SlotKind]),
}

impl SlotFilter<'_> {
    pub fn accepts(&self, kind: SlotKind) -> bool {
        match self {
            SlotFilter::Any => true,
            SlotFilter::Allowed(kinds) => kinds.contains(&kind),
            SlotFilter::Restricted(kinds) => !kinds.contains(&kind),
        }
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Hexagonal board. Topology is fixed at construction, occupancy is mutable.
#[derive(Clone, Debug)]
pub struct Board {
    radius: i32,
    slots: FxHashMap<Hex, Slot>,
}

impl Board {
    /// Flood-fill every hex closer than `radius` to the center
    pub fn new(radius: i32) -> Self {
        let mut slots = FxHashMap::default();
        let center = Hex::new(0, 0);

        if radius > 0 {
            let mut frontier = VecDeque::from([center]);
            slots.insert(center, Slot::Empty);

            while let Some(hex) = frontier.pop_front() {
                for direction in 0..DIRECTIONS.len() {
                    let next = hex.neighbor(direction);
                    if next.distance_from_center() < radius && !slots.contains_key(&next) {
                        slots.insert(next, Slot::Empty);
                        frontier.push_back(next);
                    }
                }
            }
        }

        Self { radius, slots }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.slots.contains_key(&hex)
    }

    /// Occupant of a hex
    pub fn slot(&self, hex: Hex) -> Result<Slot, BoardError> {
        self.slots.get(&hex).copied().ok_or(BoardError::NoSuchHex(hex))
    }

    /// True if the hex exists and nothing occupies it
    pub fn is_free(&self, hex: Hex) -> bool {
        matches!(self.slots.get(&hex), Some(Slot::Empty))
    }

    pub fn distance(a: Hex, b: Hex) -> i32 {
        a.distance_to(b)
    }

    /// On-board neighbors, in `DIRECTIONS` order
    pub fn neighbors(&self, hex: Hex) -> Vec<Hex> {
        (0..DIRECTIONS.len())
            .map(|direction| hex.neighbor(direction))
            .filter(|n| self.contains(*n))
            .collect()
    }

    /// All on-board hexes within `range` of `center` whose occupant passes `filter`.
    ///
    /// Order follows the ring-fill loop (q ascending, then r ascending), which
    /// AI tie-breaks rely on.
    pub fn hexes_in_range(&self, center: Hex, range: i32, filter: SlotFilter<'_>) -> Vec<Hex> {
        let mut hexes = Vec::new();
        if range < 0 {
            return hexes;
        }

        for dq in -range..=range {
            let low = (-range).max(-dq - range);
            let high = range.min(-dq + range);
            for dr in low..=high {
                let hex = center.offset(dq, dr);
                if let Some(slot) = self.slots.get(&hex) {
                    if filter.accepts(slot.kind()) {
                        hexes.push(hex);
                    }
                }
            }
        }

        hexes
    }

    /// Move `entity` onto `to`, freeing its previous hex.
    ///
    /// This is the only place entity positions change.
    pub fn place<E: Placeable + ?Sized>(&mut self, entity: &mut E, to: Hex) -> Result<(), BoardError> {
        let slot = entity.slot();
        let current = self.slot(to)?;
        if current != Slot::Empty && current != slot {
            return Err(BoardError::Occupied(to));
        }

        if let Some(from) = entity.position() {
            if from != to {
                if let Some(previous) = self.slots.get_mut(&from) {
                    // stale after a board clear
                    if *previous == slot {
                        *previous = Slot::Empty;
                    }
                }
            }
        }

        self.slots.insert(to, slot);
        entity.set_position(Some(to));
        Ok(())
    }

    /// Free a hex, returning what occupied it
    pub fn vacate(&mut self, hex: Hex) -> Result<Slot, BoardError> {
        let slot = self.slots.get_mut(&hex).ok_or(BoardError::NoSuchHex(hex))?;
        Ok(std::mem::replace(slot, Slot::Empty))
    }

    pub fn set_obstacle(&mut self, hex: Hex) -> Result<(), BoardError> {
        match self.slot(hex)? {
            Slot::Empty | Slot::Obstacle => {
                self.slots.insert(hex, Slot::Obstacle);
                Ok(())
            }
            _ => Err(BoardError::Occupied(hex)),
        }
    }

    /// Reset every hex to empty
    pub fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            *slot = Slot::Empty;
        }
    }

    /// Reset the board and scatter obstacles, one draw per eligible hex.
    /// Reserved hexes never receive an obstacle.
    pub fn clear_round<R: Rng + ?Sized>(&mut self, rng: &mut R, chance: f64, reserved: &[Hex]) {
        self.clear();

        let reserved: FxHashSet<Hex> = reserved.iter().copied().collect();
        let chance = chance.clamp(0.0, 1.0);

        for hex in self.sorted_hexes() {
            if reserved.contains(&hex) {
                continue;
            }
            if rng.gen_bool(chance) {
                self.slots.insert(hex, Slot::Obstacle);
            }
        }
    }

    /// Replace the obstacle layout with `obstacles`.
    ///
    /// Every hex must exist and hold nothing but an obstacle; on error the
    /// board is unchanged.
    pub fn load_obstacles(&mut self, obstacles: &[Hex]) -> Result<(), BoardError> {
        for &hex in obstacles {
            match self.slot(hex)? {
                Slot::Empty | Slot::Obstacle => {}
                _ => return Err(BoardError::Occupied(hex)),
            }
        }

        for slot in self.slots.values_mut() {
            if *slot == Slot::Obstacle {
                *slot = Slot::Empty;
            }
        }
        for &hex in obstacles {
            self.slots.insert(hex, Slot::Obstacle);
        }
        Ok(())
    }

    /// Obstacle hexes, sorted
    pub fn obstacles(&self) -> Vec<Hex> {
        let mut hexes: Vec<Hex> = self
            .slots
            .iter()
            .filter(|(_, slot)| **slot == Slot::Obstacle)
            .map(|(&hex, _)| hex)
            .collect();
        hexes.sort();
        hexes
    }

    /// Free hexes, sorted
    pub fn empty_hexes(&self) -> Vec<Hex> {
        let mut hexes: Vec<Hex> = self
            .slots
            .iter()
            .filter(|(_, slot)| **slot == Slot::Empty)
            .map(|(&hex, _)| hex)
            .collect();
        hexes.sort();
        hexes
    }

    /// Iterate hexes with their occupants (unordered)
    pub fn iter(&self) -> impl Iterator<Item = (Hex, Slot)> + '_ {
        self.slots.iter().map(|(&hex, &slot)| (hex, slot))
    }

    fn sorted_hexes(&self) -> Vec<Hex> {
        let mut hexes: Vec<Hex> = self.slots.keys().copied().collect();
        hexes.sort();
        hexes
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Structure;
    use crate::entities::StructureKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_hex_count() {
        for radius in 1..=9 {
            let board = Board::new(radius);
            assert_eq!(board.len() as i32, 3 * radius * radius - 3 * radius + 1);
        }
    }

    #[test]
    fn test_every_hex_inside_radius() {
        let board = Board::new(6);
        assert!(board.iter().all(|(hex, _)| hex.distance_from_center() < 6));
        assert!(!board.contains(Hex::new(6, 0)));
        assert!(board.contains(Hex::new(3, -5).offset(0, 1)));
    }

    #[test]
    fn test_distance() {
        assert_eq!(Hex::new(3, -5).distance_from_center(), 5);
        assert_eq!(Board::distance(Hex::new(0, 0), Hex::new(1, 4)), 5);
        assert_eq!(Board::distance(Hex::new(0, 3), Hex::new(-1, 4)), 1);
        assert_eq!(Board::distance(Hex::new(0, 3), Hex::new(-2, 3)), 2);
    }

    #[test]
    fn test_distance_metric_properties() {
        let board = Board::new(4);
        let hexes: Vec<Hex> = board.iter().map(|(hex, _)| hex).collect();
        for &a in &hexes {
            assert_eq!(a.distance_to(a), 0);
            for &b in &hexes {
                assert_eq!(a.distance_to(b), b.distance_to(a));
                for &c in hexes.iter().step_by(5) {
                    assert!(a.distance_to(c) <= a.distance_to(b) + b.distance_to(c));
                }
            }
        }
    }

    #[test]
    fn test_hex_id_parsing() {
        assert_eq!("3;-3".parse::<Hex>().unwrap(), Hex::new(3, -3));
        assert_eq!(Hex::new(-1, 4).to_string(), "-1;4");
        assert!(matches!("3,3".parse::<Hex>(), Err(BoardError::InvalidHexId(_))));
        assert!("a;1".parse::<Hex>().is_err());

        let json = serde_json::to_string(&Hex::new(0, -2)).unwrap();
        assert_eq!(json, "\"0;-2\"");
        let hex: Hex = serde_json::from_str("\"2;1\"").unwrap();
        assert_eq!(hex, Hex::new(2, 1));
    }

    #[test]
    fn test_neighbors() {
        let board = Board::new(6);

        let center = board.neighbors(Hex::new(0, 0));
        assert_eq!(center.len(), 6);
        for (dq, dr) in DIRECTIONS {
            assert!(center.contains(&Hex::new(dq, dr)));
        }

        // corner
        let corner = board.neighbors(Hex::new(0, 5));
        assert_eq!(corner.len(), 3);
        for (dq, dr) in [(1, -1), (0, -1), (-1, 0)] {
            assert!(corner.contains(&Hex::new(dq, 5 + dr)));
        }

        // side
        let side = board.neighbors(Hex::new(-4, -1));
        assert_eq!(side.len(), 4);
    }

    #[test]
    fn test_hexes_in_range_counts() {
        let board = Board::new(6);
        let center = Hex::new(0, 0);

        assert_eq!(board.hexes_in_range(center, 0, SlotFilter::Any), vec![center]);
        for (range, count) in [(1, 7), (2, 19), (3, 37), (4, 61), (5, 91), (6, 91)] {
            assert_eq!(board.hexes_in_range(center, range, SlotFilter::Any).len(), count);
        }

        let corner = Hex::new(0, 5);
        for (range, count) in [(1, 4), (2, 9), (3, 16), (4, 25), (10, 91)] {
            assert_eq!(board.hexes_in_range(corner, range, SlotFilter::Any).len(), count);
        }
    }

    #[test]
    fn test_filter_modes() {
        let mut board = Board::new(6);
        board.set_obstacle(Hex::new(0, 0)).unwrap();
        let mut exit = Structure::new(StructureKind::Exit);
        board.place(&mut exit, Hex::new(0, 1)).unwrap();

        let center = Hex::new(0, 0);
        let empty = [SlotKind::Empty];
        let obstacle = [SlotKind::Obstacle];
        let structure = [SlotKind::Structure];

        assert_eq!(
            board.hexes_in_range(center, 1, SlotFilter::Allowed(&obstacle)),
            vec![center]
        );
        assert_eq!(
            board.hexes_in_range(center, 1, SlotFilter::Allowed(&structure)),
            vec![Hex::new(0, 1)]
        );
        assert_eq!(
            board.hexes_in_range(center, 1, SlotFilter::Restricted(&empty)),
            vec![center, Hex::new(0, 1)]
        );
        assert_eq!(board.hexes_in_range(center, 1, SlotFilter::Allowed(&empty)).len(), 5);
        assert_eq!(board.hexes_in_range(center, 1, SlotFilter::Restricted(&obstacle)).len(), 6);
    }

    #[test]
    fn test_place_moves_back_reference() {
        let mut board = Board::new(6);
        let mut exit = Structure::new(StructureKind::Exit);

        board.place(&mut exit, Hex::new(3, -3)).unwrap();
        assert_eq!(exit.position(), Some(Hex::new(3, -3)));
        assert_eq!(board.slot(Hex::new(3, -3)).unwrap(), Slot::Structure(StructureKind::Exit));

        board.place(&mut exit, Hex::new(2, -3)).unwrap();
        assert_eq!(exit.position(), Some(Hex::new(2, -3)));
        assert_eq!(board.slot(Hex::new(3, -3)).unwrap(), Slot::Empty);

        // re-placing onto its own hex is fine
        board.place(&mut exit, Hex::new(2, -3)).unwrap();
    }

    #[test]
    fn test_place_conflicts() {
        let mut board = Board::new(6);
        board.set_obstacle(Hex::new(1, 1)).unwrap();
        let mut exit = Structure::new(StructureKind::Exit);

        assert_eq!(
            board.place(&mut exit, Hex::new(1, 1)),
            Err(BoardError::Occupied(Hex::new(1, 1)))
        );
        assert_eq!(
            board.place(&mut exit, Hex::new(9, 9)),
            Err(BoardError::NoSuchHex(Hex::new(9, 9)))
        );
        assert_eq!(exit.position(), None);
        assert_eq!(board.slot(Hex::new(1, 1)).unwrap(), Slot::Obstacle);
    }

    #[test]
    fn test_clear_round_respects_reserved() {
        let mut board = Board::new(6);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let reserved = [Hex::new(0, 3), Hex::new(0, -4)];

        board.clear_round(&mut rng, 1.0, &reserved);
        assert_eq!(board.obstacles().len(), board.len() - reserved.len());
        assert!(reserved.iter().all(|hex| board.is_free(*hex)));

        board.clear_round(&mut rng, 0.0, &reserved);
        assert!(board.obstacles().is_empty());
    }

    #[test]
    fn test_clear_round_chance() {
        let mut board = Board::new(9);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        board.clear_round(&mut rng, OBSTACLE_CHANCE, &[]);

        let ratio = board.obstacles().len() as f64 / board.len() as f64;
        assert!(ratio > 0.05 && ratio < 0.3, "ratio {}", ratio);
    }

    #[test]
    fn test_load_obstacles() {
        let mut board = Board::new(6);
        board
            .load_obstacles(&[Hex::new(1, 2), Hex::new(3, -3)])
            .unwrap();
        assert_eq!(board.slot(Hex::new(1, 2)).unwrap(), Slot::Obstacle);
        assert_eq!(board.obstacles(), vec![Hex::new(1, 2), Hex::new(3, -3)]);

        // replaces rather than adds
        board.load_obstacles(&[Hex::new(0, 0)]).unwrap();
        assert_eq!(board.obstacles(), vec![Hex::new(0, 0)]);
    }

    #[test]
    fn test_load_obstacles_is_atomic() {
        let mut board = Board::new(6);
        board.load_obstacles(&[Hex::new(1, 2)]).unwrap();
        let mut exit = Structure::new(StructureKind::Exit);
        board.place(&mut exit, Hex::new(0, -4)).unwrap();

        assert_eq!(
            board.load_obstacles(&[Hex::new(2, 2), Hex::new(8, 0)]),
            Err(BoardError::NoSuchHex(Hex::new(8, 0)))
        );
        assert_eq!(
            board.load_obstacles(&[Hex::new(2, 2), Hex::new(0, -4)]),
            Err(BoardError::Occupied(Hex::new(0, -4)))
        );
        assert_eq!(board.obstacles(), vec![Hex::new(1, 2)]);
        assert_eq!(board.slot(Hex::new(0, -4)).unwrap(), Slot::Structure(StructureKind::Exit));
    }

    #[test]
    fn test_direction_to() {
        let origin = Hex::new(0, 3);
        assert_eq!(origin.direction_to(Hex::new(0, 1)), Some((0, -1)));
        assert_eq!(origin.direction_to(Hex::new(2, 3)), Some((1, 0)));
        assert_eq!(origin.direction_to(Hex::new(-2, 5)), Some((-1, 1)));
        assert_eq!(origin.direction_to(Hex::new(1, 1)), None);
        assert_eq!(origin.direction_to(origin), None);
        for (direction, &(dq, dr)) in DIRECTIONS.iter().enumerate() {
            assert_eq!(origin.direction_to(origin.neighbor(direction)), Some((dq, dr)));
        }
    }
}
