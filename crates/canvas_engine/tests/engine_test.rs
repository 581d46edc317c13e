use canvas_engine::commands::{CreateItemCommand, MoveItemCommand};
use canvas_engine::geometry::Rect;
use canvas_engine::item::{CanvasItem, Endpoint, PortRef, PortRole, PortSide, Wire};
use canvas_engine::{Canvas, CanvasConfig};
use glam::DVec2;

#[test]
fn undo_redo_round_trips_through_the_public_canvas_api() {
    let mut canvas = Canvas::new(CanvasConfig::default());
    let id = canvas.document.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);

    let moved = canvas.document.execute(Box::new(MoveItemCommand { id, from: DVec2::ZERO, to: DVec2::new(80.0, 80.0) }));
    assert!(moved);
    assert_eq!(canvas.document.find_item(id).unwrap().as_block().unwrap().bounds.top_left(), DVec2::new(80.0, 80.0));

    assert!(canvas.undo());
    assert_eq!(canvas.document.find_item(id).unwrap().as_block().unwrap().bounds.top_left(), DVec2::ZERO);

    assert!(canvas.redo());
    assert_eq!(canvas.document.find_item(id).unwrap().as_block().unwrap().bounds.top_left(), DVec2::new(80.0, 80.0));

    assert!(!canvas.redo());
}

#[test]
fn json_round_trip_preserves_a_wire_and_its_paired_port() {
    let mut canvas = Canvas::new(CanvasConfig::default());
    let a = canvas.document.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
    let b = canvas.document.create_block(Rect::new(200.0, 0.0, 40.0, 40.0), true);

    let producer = canvas
        .document
        .find_item_mut(a)
        .unwrap()
        .as_block_mut()
        .unwrap()
        .add_port(PortSide::Right, 0.5, PortRole::Producer, "__pair:io".to_string());
    let consumer = canvas
        .document
        .find_item_mut(b)
        .unwrap()
        .as_block_mut()
        .unwrap()
        .add_port(PortSide::Left, 0.5, PortRole::Consumer, "__pair:io".to_string());

    let wire = Wire::new(
        canvas_engine::ids::ObjectId::create(),
        Endpoint::Attached(PortRef { item_id: a, port_id: producer }),
        Endpoint::Attached(PortRef { item_id: b, port_id: consumer }),
    );
    assert!(canvas.document.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire)))));

    let json = canvas.save_json(None).expect("save should succeed");

    let mut loaded = Canvas::new(CanvasConfig::default());
    loaded.load_json(&json).expect("load should succeed");

    assert_eq!(loaded.document.items().len(), 3);
    let loaded_wire = loaded.document.items().iter().find_map(|i| i.as_wire()).expect("wire survives round trip");
    let Endpoint::Attached(from) = loaded_wire.a else { panic!("endpoint should stay attached") };
    let loaded_port = loaded.document.get_port(from.item_id, from.port_id).unwrap();
    assert_eq!(loaded_port.name, "__pair:io");
}

#[test]
fn design_state_round_trip_preserves_a_tile_to_tile_link() {
    let mut canvas = Canvas::new(CanvasConfig::default());
    let a = canvas.document.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
    let b = canvas.document.create_block(Rect::new(200.0, 0.0, 40.0, 40.0), true);
    canvas.document.find_item_mut(a).unwrap().as_block_mut().unwrap().spec_id = "source".to_string();
    canvas.document.find_item_mut(b).unwrap().as_block_mut().unwrap().spec_id = "sink".to_string();

    let producer = canvas.document.find_item_mut(a).unwrap().as_block_mut().unwrap().add_port(
        PortSide::Right,
        0.5,
        PortRole::Producer,
        String::new(),
    );
    let consumer = canvas.document.find_item_mut(b).unwrap().as_block_mut().unwrap().add_port(
        PortSide::Left,
        0.5,
        PortRole::Consumer,
        String::new(),
    );
    let wire = Wire::new(
        canvas_engine::ids::ObjectId::create(),
        Endpoint::Attached(PortRef { item_id: a, port_id: producer }),
        Endpoint::Attached(PortRef { item_id: b, port_id: consumer }),
    );
    assert!(canvas.document.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire)))));

    let state = canvas.build_design_state(None).expect("projection should succeed");
    assert_eq!(state.links.len(), 1);

    canvas.apply_design_state(&state).expect("re-application should succeed");

    let state_again = canvas.build_design_state(None).expect("second projection should succeed");
    assert_eq!(state_again.links.len(), 1);
    assert_eq!(state_again.links[0].from.node_id, state.links[0].from.node_id);
    assert_eq!(state_again.links[0].to.node_id, state.links[0].to.node_id);
}
