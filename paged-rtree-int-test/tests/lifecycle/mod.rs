mod persistence_test;
mod scenario_test;
