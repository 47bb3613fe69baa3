mod repair_tests;
