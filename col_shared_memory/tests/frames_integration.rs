//! Frame decoding through a file-backed segment written by a stand-in simulator

use std::time::Duration;

use col::shm::layout::LAYOUT;
use col::shm::records::{CameraBlockHeader, GlobalHeader, HyperParams};
use col::shm::streams::StreamLabel;
use col_shared_memory::{ActionChannel, FrameDecoder, Segment, ShmResult};

fn write_frame(sim: &mut Segment, block: usize, id: u32, w: u32, h: u32, c: u32, fill: u8) -> ShmResult<()> {
    let header = CameraBlockHeader {
        camera_id: id,
        width: w,
        height: h,
        channels: c,
    };
    sim.write(LAYOUT.camera_block_offset(block), &header.encode())?;
    sim.write(
        LAYOUT.camera_pixels_offset(block),
        &vec![fill; header.pixel_bytes() as usize],
    )
}

#[test]
fn test_decode_depth_and_semantic() -> ShmResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("frames");
    let mut sim = Segment::create_path(&path)?;
    let control = Segment::acquire_path(&path, Some(Duration::from_secs(1)))?;

    let params = HyperParams {
        depth: 1,
        semantic: 1,
        image_width: 32,
        image_height: 16,
        ..Default::default()
    };

    let header = GlobalHeader {
        frame_index: 7,
        camera_count: 2,
        position: [10.0, 0.5, -3.0],
        rotation: [0.0, 180.0, 0.0],
    };
    sim.write(0, &header.encode())?;
    write_frame(&mut sim, 0, 1, 32, 16, 1, 0x11)?;
    write_frame(&mut sim, 1, 3, 32, 16, 1, 0x33)?;

    let decoder = FrameDecoder::from_hyper(*control.layout(), &params).with_identity_check(true);
    let frames = decoder.decode(&control)?;

    assert_eq!(frames.header, header);
    assert_eq!(frames.active, [false, true, false, true]);
    let depth = frames.get(StreamLabel::Depth).unwrap();
    let semantic = frames.get(StreamLabel::Semantic).unwrap();
    assert!(depth.pixels.iter().all(|&b| b == 0x11));
    assert!(semantic.pixels.iter().all(|&b| b == 0x33));
    assert_eq!(semantic.shape(), (16, 32, 1));
    assert!(frames.get(StreamLabel::Rgb).is_none());
    Ok(())
}

#[test]
fn test_actions_visible_to_simulator() -> ShmResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("actions");
    let sim = Segment::create_path(&path)?;
    let mut control = Segment::acquire_path(&path, Some(Duration::from_secs(1)))?;

    let mut channel = ActionChannel::new();
    for step in 0..5 {
        channel.publish(
            &mut control,
            col::shm::records::ActionAxes {
                forward: step,
                ..Default::default()
            },
        )?;
    }

    let seen = ActionChannel::current(&sim)?;
    assert_eq!(seen.index, 4);
    assert_eq!(seen.axes.forward, 4);
    Ok(())
}
