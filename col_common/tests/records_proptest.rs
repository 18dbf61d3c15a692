//! Round-trip law for the hyperparameter payload and the action record.

use col_common::shm::records::{ActionAxes, ActionRecord, HyperParams};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f32> {
    -1.0e6f32..1.0e6f32
}

prop_compose! {
    fn hyper_params()(
        floats in proptest::array::uniform10(finite()),
        ints in proptest::array::uniform11(any::<u32>()),
    ) -> HyperParams {
        HyperParams {
            speed_factor: floats[0],
            spawn_pedestrians: ints[0],
            spawn_cars: ints[1],
            move_speed: floats[1],
            turn_speed: floats[2],
            vertical_speed: floats[3],
            momentum: floats[4],
            fixed_delta_time: floats[5],
            n_actions: ints[2],
            rgb: ints[3],
            depth: ints[4],
            normals: ints[5],
            semantic: ints[6],
            launch_streaming: ints[7],
            render: ints[8],
            image_width: ints[9],
            image_height: ints[10],
            vertical_fov: floats[6],
            start_x: floats[7],
            start_y: floats[8],
            start_z: floats[9],
        }
    }
}

proptest! {
    #[test]
    fn hyper_payload_round_trips(hp in hyper_params()) {
        let bytes = hp.encode();
        prop_assert_eq!(HyperParams::decode(&bytes), hp);
    }

    #[test]
    fn action_record_round_trips(
        index in any::<i32>(),
        forward in any::<i32>(),
        turn in any::<i32>(),
        vertical in any::<i32>(),
        gravity in any::<i32>(),
    ) {
        let record = ActionRecord { index, axes: ActionAxes { forward, turn, vertical, gravity } };
        prop_assert_eq!(ActionRecord::decode(&record.encode()), record);
    }
}
