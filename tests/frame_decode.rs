//! End-to-end decode/encode of a captured Ethernet/IPv4/TCP SYN frame.

use bitrec::bits::Bits;
use bitrec::field::Value;
use bitrec::options::OptionItem;
use bitrec::proto::ethernet::ETHERNET;
use bitrec::proto::tcp::TCP;
use bitrec::record::Record;

const ETHERNET_HEX: &str = "000c29ba6742005056c000080800";
const IPV4_HEX: &str = "4500003447124000800627dfc0a88501c0a88580";
const TCP_HEX: &str = "b70a1e61ee3bd3cb00000000800220002bca0000020405b40103030801010402";

fn hex(s: &str) -> Vec<u8> {
    s.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

fn frame_bytes() -> Vec<u8> {
    let mut raw = hex(ETHERNET_HEX);
    raw.extend(hex(IPV4_HEX));
    raw.extend(hex(TCP_HEX));
    raw
}

fn decode_frame() -> Record {
    Record::decode(&ETHERNET, &frame_bytes()).unwrap()
}

#[test]
fn ethernet_fields() {
    let frame = decode_frame();
    assert_eq!(frame.bytes_value("dst_mac").unwrap(), hex("000c29ba6742"));
    assert_eq!(frame.bytes_value("src_mac").unwrap(), hex("005056c00008"));
    assert_eq!(frame.uint("ethertype").unwrap(), 0x0800);
    assert_eq!(frame.header_bytes(), hex(ETHERNET_HEX));
}

#[test]
fn ipv4_fields() {
    let frame = decode_frame();
    let ip = frame.payload_record().expect("ethertype 0x0800 nests IPv4");

    assert_eq!(ip.uint("version").unwrap(), 4);
    assert_eq!(ip.uint("ihl").unwrap(), 5);
    assert_eq!(ip.uint("dscp").unwrap(), 0);
    assert_eq!(ip.uint("ecn").unwrap(), 0);
    assert_eq!(ip.uint("total_length").unwrap(), 52);
    assert_eq!(ip.uint("identification").unwrap(), 0x4712);
    assert_eq!(
        ip.bits_value("flags").unwrap(),
        Bits::from_int(0b010, 3).unwrap()
    );
    assert_eq!(ip.uint("fragment_offset").unwrap(), 0);
    assert_eq!(ip.uint("ttl").unwrap(), 128);
    assert_eq!(ip.uint("protocol").unwrap(), 6);
    assert_eq!(ip.uint("checksum").unwrap(), 0x27df);
    assert_eq!(ip.uint("src_ip").unwrap(), 0xc0a88501);
    assert_eq!(ip.uint("dst_ip").unwrap(), 0xc0a88580);
    assert!(ip.raw("options").unwrap().is_empty());
    assert_eq!(ip.header_bytes(), hex(IPV4_HEX));
}

#[test]
fn tcp_fields_and_options() {
    let frame = decode_frame();
    let tcp = frame
        .payload_record()
        .and_then(Record::payload_record)
        .expect("protocol 6 nests TCP");

    assert_eq!(tcp.uint("src_port").unwrap(), 46858);
    assert_eq!(tcp.uint("dst_port").unwrap(), 7777);
    assert_eq!(tcp.uint("seq_number").unwrap(), 0xee3bd3cb);
    assert_eq!(tcp.uint("ack_number").unwrap(), 0);
    assert_eq!(tcp.uint("data_offset").unwrap(), 8);
    assert_eq!(tcp.uint("syn").unwrap(), 1);
    for flag in ["ns", "cwr", "ece", "urg", "ack", "psh", "rst", "fin"] {
        assert_eq!(tcp.uint(flag).unwrap(), 0, "flag {flag}");
    }
    assert_eq!(tcp.uint("window_size").unwrap(), 8192);
    assert_eq!(tcp.uint("checksum").unwrap(), 0x2bca);
    assert_eq!(tcp.uint("urgent_pointer").unwrap(), 0);
    assert_eq!(tcp.to_bytes(), hex(TCP_HEX));

    let options = tcp.options("options").unwrap();
    assert_eq!(options.len(), 6);

    let OptionItem::Record(mss) = &options[0] else {
        panic!("expected max segment size");
    };
    assert_eq!(mss.uint("kind").unwrap(), 2);
    assert_eq!(mss.uint("length").unwrap(), 4);
    assert_eq!(mss.uint("value").unwrap(), 1460);

    assert_eq!(options[1], OptionItem::Literal(Bits::from_bytes(&[0x01])));

    let OptionItem::Record(scale) = &options[2] else {
        panic!("expected window scale");
    };
    assert_eq!(scale.uint("kind").unwrap(), 3);
    assert_eq!(scale.uint("length").unwrap(), 3);
    assert_eq!(scale.uint("value").unwrap(), 8);

    assert_eq!(options[3], OptionItem::Literal(Bits::from_bytes(&[0x01])));
    assert_eq!(options[4], OptionItem::Literal(Bits::from_bytes(&[0x01])));

    let OptionItem::Record(sack_permitted) = &options[5] else {
        panic!("expected sack permitted");
    };
    assert_eq!(sack_permitted.uint("kind").unwrap(), 4);
    assert_eq!(sack_permitted.uint("length").unwrap(), 2);
}

#[test]
fn serialization_is_byte_exact() {
    let frame = decode_frame();
    assert_eq!(frame.to_bytes(), frame_bytes());
    assert_eq!(frame.byte_len(), frame_bytes().len());

    let again = Record::decode(&ETHERNET, &frame.to_bytes()).unwrap();
    assert_eq!(again, frame);
}

#[test]
fn rewriting_every_field_changes_nothing() {
    let mut frame = decode_frame();
    let before = frame.to_bytes();

    rewrite_all(&mut frame);
    let ip = frame.payload_record_mut().unwrap();
    rewrite_all(ip);
    let tcp = ip.payload_record_mut().unwrap();
    rewrite_all(tcp);

    assert_eq!(frame.to_bytes(), before);
}

fn rewrite_all(record: &mut Record) {
    let names: Vec<String> = record.schema().field_names().map(String::from).collect();
    for name in names {
        let value = record.get(&name).unwrap();
        record.set(&name, value).unwrap();
    }
}

#[test]
fn rebuilding_from_extracted_values_matches() {
    let frame = decode_frame();
    let tcp = frame
        .payload_record()
        .and_then(Record::payload_record)
        .unwrap();

    let names: Vec<String> = tcp.schema().field_names().map(String::from).collect();
    let values: Vec<(String, Value)> = names
        .into_iter()
        .map(|name| {
            let value = tcp.get(&name).unwrap();
            (name, value)
        })
        .collect();

    let rebuilt = Record::build(
        &TCP,
        values.iter().map(|(name, value)| (name.as_str(), value.clone())),
    )
    .unwrap();
    assert_eq!(rebuilt.to_bytes(), hex(TCP_HEX));
}

#[test]
fn ipv4_checksum_refill_reproduces_capture() {
    let frame = decode_frame();
    let mut ip = frame.payload_record().unwrap().clone();

    assert_eq!(ip.uint("checksum").unwrap(), 0x27df);
    ip.fill_checksum(None).unwrap();
    assert_eq!(ip.uint("checksum").unwrap(), 0x27df);

    ip.set_uint("checksum", 0x0233).unwrap();
    ip.fill_checksum(None).unwrap();
    assert_eq!(ip.uint("checksum").unwrap(), 0x27df);
}

#[test]
fn tcp_checksum_refill_reproduces_capture() {
    let frame = decode_frame();
    let ip = frame.payload_record().unwrap().clone();
    let mut tcp = ip.payload_record().unwrap().clone();

    assert_eq!(tcp.uint("checksum").unwrap(), 0x2bca);
    tcp.fill_checksum(Some(&ip)).unwrap();
    assert_eq!(tcp.uint("checksum").unwrap(), 0x2bca);

    tcp.set_uint("checksum", 0x2333).unwrap();
    tcp.fill_checksum(Some(&ip)).unwrap();
    assert_eq!(tcp.uint("checksum").unwrap(), 0x2bca);
}

#[test]
fn recursive_checksum_fill_restores_frame() {
    let mut frame = decode_frame();
    let original = frame.to_bytes();

    let ip = frame.payload_record_mut().unwrap();
    ip.set_uint("checksum", 0xdead).unwrap();
    let tcp = ip.payload_record_mut().unwrap();
    tcp.set_uint("checksum", 0xbeef).unwrap();
    assert_ne!(frame.to_bytes(), original);

    frame.fill_checksums().unwrap();
    assert_eq!(frame.to_bytes(), original);
}

#[test]
fn options_width_follows_decoded_data_offset() {
    let frame = decode_frame();
    let tcp = frame
        .payload_record()
        .and_then(Record::payload_record)
        .unwrap();
    // data_offset 8 was decoded, not the declared default of 5.
    assert_eq!(tcp.raw("options").unwrap().len(), (8 - 5) * 32);

    // Fresh segments size the region from their own header-length value:
    // each extra 32-bit word grows the serialization by exactly 32 bits.
    let short = Record::build(&TCP, [("data_offset", Value::Uint(5))]).unwrap();
    let long = Record::build(&TCP, [("data_offset", Value::Uint(8))]).unwrap();
    assert_eq!(long.bit_len() - short.bit_len(), (8 - 5) * 32);
}
