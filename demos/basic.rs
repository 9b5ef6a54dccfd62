use rylv_statsd_encoding::{
    DatagramSink, MetricEncoder, MetricEncoderOptions, MetricResult, MetricType, TagFormatOptions,
};
use std::net::UdpSocket;

/// Sends each datagram over a connected UDP socket.
struct UdpSink(UdpSocket);

impl DatagramSink for UdpSink {
    fn send(&self, datagram: &[u8]) -> MetricResult<usize> {
        Ok(self.0.send(datagram)?)
    }
}

fn main() -> MetricResult<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("127.0.0.1:8125")?;
    let sink = UdpSink(socket);

    let encoder = MetricEncoder::new(MetricEncoderOptions {
        stats_prefix: "myapp.".to_string(),
        max_datagram_size: 1432,
        tags: TagFormatOptions::dogstatsd(),
    })?;

    let tags = [("endpoint", Some("api")), ("canary", None)];
    encoder.emit(&sink, "request.count", 1, MetricType::Count, &tags)?;
    encoder.emit(&sink, "connections.active", 100, MetricType::Gauge, &tags)?;
    encoder.emit_sampled(&sink, "request.latency", 12.5, MetricType::Timing, 0.5, &tags)?;

    println!("Sent 3 metrics to 127.0.0.1:8125");
    Ok(())
}
