use blox_tests::proj_test;

proj_test!(loops, "loops");
proj_test!(broadcast_and_wait, "broadcast");
proj_test!(broadcast_barrier, "barrier");
proj_test!(warp, "warp");
proj_test!(custom_blocks, "custom");
proj_test!(tail_recursion, "recursion");
proj_test!(continuations, "continuations");
proj_test!(lists, "lists");
proj_test!(clones, "clones");
proj_test!(code_mapping, "code");
