/// Decides whether two atoms are bonded from their covalent radii and squared distance.
///
/// The pair is bonded when
/// `min_bond_distance² <= distance_squared <= (radius_a + radius_b + tolerance)²`.
/// Pairs closer than `min_bond_distance` are treated as coincident and never
/// bonded. All comparisons are done on squared distances.
#[inline]
pub fn is_bonded(
    radius_a: f64,
    radius_b: f64,
    tolerance: f64,
    min_bond_distance: f64,
    distance_squared: f64,
) -> bool {
    let max_acceptable = radius_a + radius_b + tolerance;
    if distance_squared < min_bond_distance * min_bond_distance {
        return false;
    }
    distance_squared <= max_acceptable * max_acceptable
}
