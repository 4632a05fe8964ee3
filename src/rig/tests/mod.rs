mod test_provider_basic;
mod test_ribbon_basic;
