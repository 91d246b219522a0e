use super::atom::Atom;
use super::ids::AtomId;
use super::topology::{Bond, BondOrder};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

/// Represents a molecular system: a set of atoms and the bonds between them.
///
/// Atoms are stored in a slot map so that [`AtomId`] handles stay valid across
/// removals, while a separate order list preserves the order in which atoms were
/// added (the order they are read from and written back to files).
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms using a slot map for efficient ID management.
    atoms: SlotMap<AtomId, Atom>,
    /// Atom IDs in insertion order.
    order: Vec<AtomId>,
    /// List of all bonds in the system.
    bonds: Vec<Bond>,
    /// Lookup map for finding atoms by their file serial number.
    serial_map: HashMap<usize, AtomId>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in insertion order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.order.iter().map(move |&id| (id, &self.atoms[id]))
    }

    /// Returns a mutable iterator over all atoms in storage order.
    ///
    /// Storage order equals insertion order unless atoms have been removed.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    /// Returns the IDs of all atoms in insertion order.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.order
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns a slice of all bonds in the system.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Finds an atom by its serial number.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` if an atom with this serial exists, otherwise `None`.
    pub fn find_atom_by_serial(&self, serial: usize) -> Option<AtomId> {
        self.serial_map.get(&serial).copied()
    }

    /// Adds an atom to the system.
    ///
    /// The atom is appended to the insertion order and gets an empty adjacency list.
    /// If another atom already uses the same serial, the serial lookup is
    /// redirected to the new atom.
    ///
    /// # Return
    ///
    /// The ID of the new atom.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let serial = atom.serial;
        let atom_id = self.atoms.insert(atom);
        self.order.push(atom_id);
        self.serial_map.insert(serial, atom_id);
        self.bond_adjacency.insert(atom_id, Vec::new());
        atom_id
    }

    /// Adds a bond between two atoms.
    ///
    /// This method is idempotent; adding a bond that already exists (in either
    /// direction) succeeds without creating a duplicate.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - ID of the first atom.
    /// * `atom2_id` - ID of the second atom.
    /// * `order` - The order of the bond.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if successful, otherwise `None` (if either atom doesn't
    /// exist or both IDs are the same atom).
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if self.has_bond(atom1_id, atom2_id) {
            // Bond already exists, operation is successful (idempotent)
            return Some(());
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Returns `true` if the two atoms are bonded, in either direction.
    pub fn has_bond(&self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        self.bond_adjacency
            .get(atom1_id)
            .is_some_and(|neighbors| neighbors.contains(&atom2_id))
    }

    /// Finds the bond between two atoms, regardless of the order they are given in.
    pub fn bond_between(&self, atom1_id: AtomId, atom2_id: AtomId) -> Option<&Bond> {
        if !self.has_bond(atom1_id, atom2_id) {
            return None;
        }
        self.bonds.iter().find(|b| b.connects(atom1_id, atom2_id))
    }

    /// Removes every bond from the system, keeping all atoms.
    pub fn clear_bonds(&mut self) {
        self.bonds.clear();
        for (_, neighbors) in self.bond_adjacency.iter_mut() {
            neighbors.clear();
        }
    }

    /// Removes an atom from the system.
    ///
    /// All bonds connected to the atom are removed as well.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed and was removed, otherwise `None`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        self.order.retain(|&id| id != atom_id);
        if self.serial_map.get(&atom.serial) == Some(&atom_id) {
            self.serial_map.remove(&atom.serial);
        }

        self.bonds.retain(|bond| !bond.contains(atom_id));

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        Some(atom)
    }

    /// Retrieves the bonded neighbors of an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(&[AtomId])` if the atom exists, otherwise `None`.
    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }
}
