use core::module_path;
use function_name::named;

use super::{run, workload};

#[test]
#[named]
pub fn starved_process() {
    let processes = workload(&[(1, 0, 10, 0), (2, 0, 3, 8)]);

    run(
        module_path!().split("::").last().unwrap(),
        function_name!(),
        &processes,
    );
}
