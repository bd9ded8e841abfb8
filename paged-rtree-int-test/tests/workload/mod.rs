mod random_workload_test;
