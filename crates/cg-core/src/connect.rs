use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::{Direction, Position};

/// Candidate neighbor positions mapped to the link types accepted there.
pub type ConnectionMap = BTreeMap<Position, ConnectSet>;

/// The kind of link a charge block exposes to its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectType {
    /// A full block: links on every face.
    Block,
    /// A bottom half-slab: links sideways to slabs and wires, down to solid
    /// blocks, and up only to track.
    Slab,
    /// Electrified track: links to the block it rests on and to track along
    /// the same line, including one-step slopes.
    Track,
    /// Wire: links on every face to anything except track.
    Wire,
}

impl ConnectType {
    /// All link types.
    pub const ALL: [ConnectType; 4] = [Self::Block, Self::Slab, Self::Track, Self::Wire];

    const fn bit(self) -> u8 {
        match self {
            Self::Block => 1,
            Self::Slab => 1 << 1,
            Self::Track => 1 << 2,
            Self::Wire => 1 << 3,
        }
    }

    /// The positions this type may link with when placed at `pos`, and which
    /// link types it accepts at each of them.
    ///
    /// This is one side of the handshake only. An edge exists only when the
    /// block at the other end also lists `pos` and accepts this type.
    pub fn possible_connections(self, pos: Position) -> ConnectionMap {
        let mut map = ConnectionMap::new();
        // Candidates past the edge of the coordinate range are skipped.
        let mut put = |candidate: Option<Position>, accepted: ConnectSet| {
            if let Some(candidate) = candidate {
                map.insert(candidate, accepted);
            }
        };
        match self {
            Self::Block => {
                for dir in Direction::ALL {
                    put(pos.step(dir), ConnectSet::ALL);
                }
            }
            Self::Slab => {
                put(pos.down(), ConnectSet::of(&[Self::Block, Self::Slab, Self::Wire]));
                for dir in Direction::HORIZONTAL {
                    put(pos.step(dir), ConnectSet::of(&[Self::Slab, Self::Wire]));
                }
                put(pos.up(), ConnectSet::of(&[Self::Track]));
            }
            Self::Track => {
                put(pos.down(), ConnectSet::of(&[Self::Block, Self::Slab]));
                let track = ConnectSet::of(&[Self::Track]);
                for dir in Direction::HORIZONTAL {
                    let Some(side) = pos.step(dir) else {
                        continue;
                    };
                    put(Some(side), track);
                    put(side.up(), track);
                    put(side.down(), track);
                }
            }
            Self::Wire => {
                let accepted = ConnectSet::of(&[Self::Block, Self::Slab, Self::Wire]);
                for dir in Direction::ALL {
                    put(pos.step(dir), accepted);
                }
            }
        }
        map
    }
}

impl fmt::Display for ConnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Slab => write!(f, "slab"),
            Self::Track => write!(f, "track"),
            Self::Wire => write!(f, "wire"),
        }
    }
}

/// A small set of [`ConnectType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectSet(u8);

impl ConnectSet {
    /// The empty set.
    pub const EMPTY: ConnectSet = ConnectSet(0);
    /// Every link type.
    pub const ALL: ConnectSet = ConnectSet(0b1111);

    /// Build a set from a slice of types.
    pub const fn of(types: &[ConnectType]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Return `true` if `ty` is in the set.
    pub const fn contains(self, ty: ConnectType) -> bool {
        self.0 & ty.bit() != 0
    }

    /// Return `true` if the set has no members.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = ConnectType> {
        ConnectType::ALL.into_iter().filter(move |ty| self.contains(*ty))
    }
}

impl FromIterator<ConnectType> for ConnectSet {
    fn from_iter<I: IntoIterator<Item = ConnectType>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |bits, ty| bits | ty.bit()))
    }
}
