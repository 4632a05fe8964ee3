mod test_basis_basic;
mod test_knots_basic;
