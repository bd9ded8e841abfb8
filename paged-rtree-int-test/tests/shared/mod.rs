mod shared_index_test;
