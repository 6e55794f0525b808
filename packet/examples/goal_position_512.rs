use dynamixel2_packet::{Connection, Fields, X_SERIES};

const ID: u8 = 1;

fn main() -> Result<(), dynamixel2_packet::Error> {
    let (address, data) = X_SERIES.encode_field("goal_position", 512)?;
    let mut connection = Connection::new();
    let frame = connection.assemble(
        "write",
        ID,
        &Fields::new().with("address", address).with("data", data),
    )?;
    println!("{frame:02X?}");
    Ok(())
}
