//! Route netlink backend for [`NetlinkOps`](crate::NetlinkOps).
//!
//! Talks NETLINK_ROUTE over a blocking socket: one request at a time,
//! each answered either by an ack (mutations) or a multi-part dump.

#[cfg(target_os = "linux")]
mod linux {
    use std::io;
    use std::net::IpAddr;

    use netlink_packet_core::{
        NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP,
        NLM_F_EXCL, NLM_F_REQUEST,
    };
    use netlink_packet_route::link::{
        InfoData, InfoKind, InfoVrf, LinkAttribute, LinkFlags, LinkInfo, LinkMessage,
    };
    use netlink_packet_route::route::{
        RouteAddress, RouteAttribute, RouteMessage, RouteProtocol, RouteScope, RouteType,
    };
    use netlink_packet_route::{AddressFamily, RouteNetlinkMessage};
    use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};
    use parking_lot::Mutex;
    use tracing::{debug, instrument};

    use crate::error::{FabricError, FabricResult};
    use crate::netlink::{IpFamily, Link, LinkKind, NetlinkOps, Route};

    /// Receive buffer capacity; a dump reply is split across several reads.
    const RECV_BUFFER_SIZE: usize = 64 * 1024;

    /// `rtm_table` value meaning "look at RTA_TABLE instead".
    const RT_TABLE_UNSPEC: u8 = 0;

    const DUMP_FLAGS: u16 = NLM_F_REQUEST | NLM_F_DUMP;
    const ACK_FLAGS: u16 = NLM_F_REQUEST | NLM_F_ACK;
    const CREATE_FLAGS: u16 = NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL;

    struct Inner {
        socket: Socket,
        sequence: u32,
        buffer: Vec<u8>,
    }

    /// Blocking NETLINK_ROUTE client.
    ///
    /// Requests are serialized through an internal lock so a single
    /// instance can be shared between threads.
    pub struct RtNetlink {
        inner: Mutex<Inner>,
    }

    impl RtNetlink {
        /// Opens and connects a NETLINK_ROUTE socket.
        ///
        /// Mutations require CAP_NET_ADMIN.
        #[instrument]
        pub fn new() -> FabricResult<Self> {
            let mut socket = Socket::new(NETLINK_ROUTE)
                .map_err(|e| FabricError::platform_query("open_socket", e))?;
            socket
                .bind_auto()
                .map_err(|e| FabricError::platform_query("bind_socket", e))?;
            socket
                .connect(&SocketAddr::new(0, 0))
                .map_err(|e| FabricError::platform_query("connect_socket", e))?;

            debug!("Route netlink socket connected");

            Ok(Self {
                inner: Mutex::new(Inner {
                    socket,
                    sequence: 0,
                    buffer: Vec::with_capacity(RECV_BUFFER_SIZE),
                }),
            })
        }

        /// Sends one request and collects the replies belonging to it.
        ///
        /// Dumps end on NLMSG_DONE, acked mutations on an NLMSG_ERROR whose
        /// code is zero. A non-zero code is returned as an OS error.
        fn request(
            &self,
            flags: u16,
            payload: RouteNetlinkMessage,
        ) -> io::Result<Vec<RouteNetlinkMessage>> {
            let mut guard = self.inner.lock();
            guard.sequence = guard.sequence.wrapping_add(1);
            let seq = guard.sequence;
            let dump = flags & NLM_F_DUMP == NLM_F_DUMP;

            let mut header = NetlinkHeader::default();
            header.flags = flags;
            header.sequence_number = seq;

            let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
            packet.finalize();
            let mut out = vec![0u8; packet.buffer_len()];
            packet.serialize(&mut out);

            let Inner { socket, buffer, .. } = &mut *guard;
            socket.send(&out, 0)?;

            let mut replies = Vec::new();
            loop {
                buffer.clear();
                let len = socket.recv(buffer, 0)?;
                let mut offset = 0;

                while offset < len {
                    let msg = NetlinkMessage::<RouteNetlinkMessage>::deserialize(
                        &buffer[offset..len],
                    )
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

                    let msg_len = msg.header.length as usize;
                    if msg_len == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "zero-length netlink message",
                        ));
                    }
                    // Netlink messages are 4-byte aligned
                    offset = (offset + msg_len + 3) & !3;

                    if msg.header.sequence_number != seq {
                        debug!(seq = msg.header.sequence_number, "Skipping stale reply");
                        continue;
                    }

                    match msg.payload {
                        NetlinkPayload::InnerMessage(inner) => replies.push(inner),
                        NetlinkPayload::Done(_) => return Ok(replies),
                        NetlinkPayload::Error(err) => {
                            return match err.code {
                                Some(code) => Err(io::Error::from_raw_os_error(-code.get())),
                                None => Ok(replies),
                            };
                        }
                        _ if !dump => return Ok(replies),
                        _ => {}
                    }
                }
            }
        }

        fn ifindex(operation: &str, name: &str) -> FabricResult<u32> {
            nix::net::if_::if_nametoindex(name)
                .map_err(|e| FabricError::platform_query(operation, format!("{}: {}", name, e)))
        }
    }

    impl NetlinkOps for RtNetlink {
        #[instrument(skip(self))]
        fn list_links(&self, kind: Option<LinkKind>) -> FabricResult<Vec<Link>> {
            let replies = self
                .request(
                    DUMP_FLAGS,
                    RouteNetlinkMessage::GetLink(LinkMessage::default()),
                )
                .map_err(|e| FabricError::platform_query("list_links", e))?;

            let links: Vec<Link> = replies
                .into_iter()
                .filter_map(|msg| match msg {
                    RouteNetlinkMessage::NewLink(link) => Some(parse_link(link)),
                    _ => None,
                })
                .filter(|link| kind.is_none() || link.kind == kind)
                .collect();

            debug!(count = links.len(), "Listed links");
            Ok(links)
        }

        #[instrument(skip(self))]
        fn create_vrf(&self, name: &str, table_id: u32) -> FabricResult<()> {
            let msg = create_vrf_message(name, table_id);
            self.request(CREATE_FLAGS, RouteNetlinkMessage::NewLink(msg))
                .map_err(|e| {
                    FabricError::platform_mutation("create_vrf", format!("{}: {}", name, e))
                })?;
            Ok(())
        }

        #[instrument(skip(self))]
        fn delete_link(&self, name: &str) -> FabricResult<()> {
            let mut msg = LinkMessage::default();
            msg.header.index = Self::ifindex("delete_link", name)?;

            self.request(ACK_FLAGS, RouteNetlinkMessage::DelLink(msg))
                .map_err(|e| {
                    FabricError::platform_mutation("delete_link", format!("{}: {}", name, e))
                })?;
            Ok(())
        }

        #[instrument(skip(self))]
        fn list_routes(&self, family: IpFamily, table_id: u32) -> FabricResult<Vec<Route>> {
            let mut msg = RouteMessage::default();
            msg.header.address_family = address_family(family);

            let replies = self
                .request(DUMP_FLAGS, RouteNetlinkMessage::GetRoute(msg))
                .map_err(|e| FabricError::platform_query("list_routes", e))?;

            let routes = routes_in_table(replies, family, table_id);
            debug!(count = routes.len(), "Listed routes");
            Ok(routes)
        }

        #[instrument(skip(self, route), fields(route = %route))]
        fn delete_route(&self, route: &Route) -> FabricResult<()> {
            self.request(
                ACK_FLAGS,
                RouteNetlinkMessage::DelRoute(delete_route_message(route)),
            )
            .map_err(|e| {
                FabricError::platform_mutation("delete_route", format!("{}: {}", route, e))
            })?;
            Ok(())
        }

        #[instrument(skip(self))]
        fn set_link_up(&self, name: &str) -> FabricResult<()> {
            let mut msg = LinkMessage::default();
            msg.header.index = Self::ifindex("set_link_up", name)?;
            msg.header.flags = LinkFlags::Up;
            msg.header.change_mask = LinkFlags::Up;

            self.request(ACK_FLAGS, RouteNetlinkMessage::SetLink(msg))
                .map_err(|e| {
                    FabricError::platform_mutation("set_link_up", format!("{}: {}", name, e))
                })?;
            Ok(())
        }
    }

    fn address_family(family: IpFamily) -> AddressFamily {
        match family {
            IpFamily::V4 => AddressFamily::Inet,
            IpFamily::V6 => AddressFamily::Inet6,
        }
    }

    fn route_address(addr: IpAddr) -> RouteAddress {
        match addr {
            IpAddr::V4(v4) => RouteAddress::Inet(v4),
            IpAddr::V6(v6) => RouteAddress::Inet6(v6),
        }
    }

    fn parse_route_address(addr: &RouteAddress) -> Option<IpAddr> {
        match addr {
            RouteAddress::Inet(v4) => Some(IpAddr::V4(*v4)),
            RouteAddress::Inet6(v6) => Some(IpAddr::V6(*v6)),
            _ => None,
        }
    }

    fn create_vrf_message(name: &str, table_id: u32) -> LinkMessage {
        let mut msg = LinkMessage::default();
        msg.attributes.push(LinkAttribute::IfName(name.to_string()));
        msg.attributes.push(LinkAttribute::LinkInfo(vec![
            LinkInfo::Kind(InfoKind::Vrf),
            LinkInfo::Data(InfoData::Vrf(vec![InfoVrf::TableId(table_id)])),
        ]));
        msg
    }

    /// Builds an RTM_DELROUTE addressing exactly `route`.
    ///
    /// Tables above 255 do not fit `rtm_table`; the header then carries
    /// RT_TABLE_UNSPEC and the kernel reads RTA_TABLE.
    fn delete_route_message(route: &Route) -> RouteMessage {
        let mut msg = RouteMessage::default();
        msg.header.address_family = address_family(route.family);
        msg.header.destination_prefix_length = route.destination_prefix_len;
        msg.header.table = u8::try_from(route.table).unwrap_or(RT_TABLE_UNSPEC);
        msg.header.protocol = RouteProtocol::from(route.protocol);
        msg.header.scope = RouteScope::from(route.scope);
        msg.header.kind = RouteType::from(route.kind);

        msg.attributes.push(RouteAttribute::Table(route.table));
        if let Some(dst) = route.destination {
            msg.attributes
                .push(RouteAttribute::Destination(route_address(dst)));
        }
        if let Some(gw) = route.gateway {
            msg.attributes.push(RouteAttribute::Gateway(route_address(gw)));
        }
        if let Some(oif) = route.output_interface {
            msg.attributes.push(RouteAttribute::Oif(oif));
        }
        if let Some(priority) = route.priority {
            msg.attributes.push(RouteAttribute::Priority(priority));
        }
        msg
    }

    /// The route dump covers every table; keep the requested one.
    fn routes_in_table(
        replies: Vec<RouteNetlinkMessage>,
        family: IpFamily,
        table_id: u32,
    ) -> Vec<Route> {
        replies
            .into_iter()
            .filter_map(|msg| match msg {
                RouteNetlinkMessage::NewRoute(route) => Some(parse_route(family, route)),
                _ => None,
            })
            .filter(|route| route.table == table_id)
            .collect()
    }

    fn parse_link(msg: LinkMessage) -> Link {
        let mut name = String::new();
        let mut kind = None;
        let mut vrf_table = None;

        for attr in msg.attributes {
            match attr {
                LinkAttribute::IfName(n) => name = n,
                LinkAttribute::LinkInfo(infos) => {
                    for info in infos {
                        match info {
                            LinkInfo::Kind(k) => kind = Some(LinkKind::from_kernel(&k.to_string())),
                            LinkInfo::Data(InfoData::Vrf(data)) => {
                                for item in data {
                                    if let InfoVrf::TableId(id) = item {
                                        vrf_table = Some(id);
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Link {
            index: msg.header.index,
            name,
            kind,
            vrf_table,
            up: msg.header.flags.contains(LinkFlags::Up),
        }
    }

    /// RTA_TABLE, when present, wins over the 8-bit `rtm_table`.
    fn parse_route(family: IpFamily, msg: RouteMessage) -> Route {
        let mut route = Route::new(
            family,
            u32::from(msg.header.table),
            None,
            msg.header.destination_prefix_length,
        );
        route.protocol = u8::from(msg.header.protocol);
        route.scope = u8::from(msg.header.scope);
        route.kind = u8::from(msg.header.kind);

        for attr in &msg.attributes {
            match attr {
                RouteAttribute::Table(table) => route.table = *table,
                RouteAttribute::Destination(addr) => route.destination = parse_route_address(addr),
                RouteAttribute::Gateway(addr) => route.gateway = parse_route_address(addr),
                RouteAttribute::Oif(oif) => route.output_interface = Some(*oif),
                RouteAttribute::Priority(priority) => route.priority = Some(*priority),
                _ => {}
            }
        }

        route
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use pretty_assertions::assert_eq;

        /// RT_TABLE_COMPAT, reported in `rtm_table` for tables above 255
        const RT_TABLE_COMPAT: u8 = 252;

        fn route_message(table: u8, attributes: Vec<RouteAttribute>) -> RouteMessage {
            let mut msg = RouteMessage::default();
            msg.header.address_family = AddressFamily::Inet;
            msg.header.destination_prefix_length = 16;
            msg.header.table = table;
            msg.header.kind = RouteType::Unicast;
            msg.attributes = attributes;
            msg
        }

        fn v4_dst(addr: &str) -> RouteAttribute {
            RouteAttribute::Destination(RouteAddress::Inet(addr.parse().unwrap()))
        }

        #[test]
        fn test_parse_route_prefers_rta_table() {
            let msg = route_message(
                RT_TABLE_COMPAT,
                vec![RouteAttribute::Table(1000), v4_dst("10.1.0.0")],
            );

            let route = parse_route(IpFamily::V4, msg);
            assert_eq!(route.table, 1000);
            assert_eq!(route.destination, Some("10.1.0.0".parse().unwrap()));
            assert_eq!(route.destination_prefix_len, 16);
        }

        #[test]
        fn test_parse_route_falls_back_to_header_table() {
            let msg = route_message(7, vec![v4_dst("10.1.0.0")]);
            assert_eq!(parse_route(IpFamily::V4, msg).table, 7);
        }

        #[test]
        fn test_parse_route_fields() {
            let mut msg = route_message(
                5,
                vec![
                    RouteAttribute::Gateway(RouteAddress::Inet("10.0.0.1".parse().unwrap())),
                    RouteAttribute::Oif(4),
                    RouteAttribute::Priority(100),
                ],
            );
            msg.header.destination_prefix_length = 0;

            let route = parse_route(IpFamily::V4, msg);
            assert_eq!(route.destination, None);
            assert_eq!(route.gateway, Some("10.0.0.1".parse().unwrap()));
            assert_eq!(route.output_interface, Some(4));
            assert_eq!(route.priority, Some(100));
            assert_eq!(route.kind, u8::from(RouteType::Unicast));
            assert_eq!(route.to_string(), "default via 10.0.0.1 table 5");
        }

        #[test]
        fn test_routes_in_table_filters_dump() {
            let replies = vec![
                RouteNetlinkMessage::NewRoute(route_message(
                    RT_TABLE_COMPAT,
                    vec![RouteAttribute::Table(1000), v4_dst("10.1.0.0")],
                )),
                RouteNetlinkMessage::NewRoute(route_message(
                    RT_TABLE_COMPAT,
                    vec![RouteAttribute::Table(1001), v4_dst("10.2.0.0")],
                )),
                RouteNetlinkMessage::NewRoute(route_message(254, vec![v4_dst("10.3.0.0")])),
                RouteNetlinkMessage::NewLink(LinkMessage::default()),
            ];

            let routes = routes_in_table(replies, IpFamily::V4, 1000);
            assert_eq!(routes.len(), 1);
            assert_eq!(routes[0].destination, Some("10.1.0.0".parse().unwrap()));
        }

        #[test]
        fn test_parse_vrf_link() {
            let mut msg = create_vrf_message("G0000000jU00GV", 42);
            msg.header.index = 9;
            msg.header.flags = LinkFlags::Up;

            let link = parse_link(msg);
            assert_eq!(
                link,
                Link {
                    index: 9,
                    name: "G0000000jU00GV".to_string(),
                    kind: Some(LinkKind::Vrf),
                    vrf_table: Some(42),
                    up: true,
                }
            );
        }

        #[test]
        fn test_parse_link_keeps_kernel_kind_name() {
            let mut msg = LinkMessage::default();
            msg.attributes.push(LinkAttribute::IfName("veth0".to_string()));
            msg.attributes
                .push(LinkAttribute::LinkInfo(vec![LinkInfo::Kind(InfoKind::Veth)]));
            let link = parse_link(msg);
            assert_eq!(link.kind, Some(LinkKind::Other("veth".to_string())));
            assert!(!link.up);

            let mut msg = LinkMessage::default();
            msg.attributes.push(LinkAttribute::LinkInfo(vec![LinkInfo::Kind(
                InfoKind::Other("foo".to_string()),
            )]));
            assert_eq!(
                parse_link(msg).kind,
                Some(LinkKind::Other("foo".to_string()))
            );
        }

        #[test]
        fn test_delete_route_message_small_table() {
            let mut route = Route::new(IpFamily::V6, 7, Some("fd00::".parse().unwrap()), 64);
            route.gateway = Some("fd00::1".parse().unwrap());
            route.output_interface = Some(3);

            let msg = delete_route_message(&route);
            assert_eq!(msg.header.address_family, AddressFamily::Inet6);
            assert_eq!(msg.header.table, 7);
            assert_eq!(msg.header.destination_prefix_length, 64);
            assert_eq!(
                msg.attributes,
                vec![
                    RouteAttribute::Table(7),
                    RouteAttribute::Destination(RouteAddress::Inet6("fd00::".parse().unwrap())),
                    RouteAttribute::Gateway(RouteAddress::Inet6("fd00::1".parse().unwrap())),
                    RouteAttribute::Oif(3),
                ]
            );
        }

        #[test]
        fn test_delete_route_message_large_table() {
            let route = Route::new(IpFamily::V4, 1000, None, 0);

            let msg = delete_route_message(&route);
            assert_eq!(msg.header.table, RT_TABLE_UNSPEC);
            assert_eq!(msg.attributes, vec![RouteAttribute::Table(1000)]);
        }

        #[test]
        fn test_delete_message_matches_parsed_route() {
            let original = route_message(
                RT_TABLE_COMPAT,
                vec![RouteAttribute::Table(1000), v4_dst("10.1.0.0")],
            );
            let route = parse_route(IpFamily::V4, original);

            let msg = delete_route_message(&route);
            assert_eq!(msg.header.kind, RouteType::Unicast);
            assert_eq!(parse_route(IpFamily::V4, msg), route);
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::*;

/// Placeholder for non-Linux platforms (development only)
#[cfg(not(target_os = "linux"))]
mod unsupported {
    use crate::error::{FabricError, FabricResult};
    use crate::netlink::{IpFamily, Link, LinkKind, NetlinkOps, Route};

    const UNSUPPORTED: &str = "route netlink requires Linux";

    pub struct RtNetlink;

    impl RtNetlink {
        pub fn new() -> FabricResult<Self> {
            Err(FabricError::platform_query("open_socket", UNSUPPORTED))
        }
    }

    impl NetlinkOps for RtNetlink {
        fn list_links(&self, _kind: Option<LinkKind>) -> FabricResult<Vec<Link>> {
            Err(FabricError::platform_query("list_links", UNSUPPORTED))
        }

        fn create_vrf(&self, _name: &str, _table_id: u32) -> FabricResult<()> {
            Err(FabricError::platform_mutation("create_vrf", UNSUPPORTED))
        }

        fn delete_link(&self, _name: &str) -> FabricResult<()> {
            Err(FabricError::platform_mutation("delete_link", UNSUPPORTED))
        }

        fn list_routes(&self, _family: IpFamily, _table_id: u32) -> FabricResult<Vec<Route>> {
            Err(FabricError::platform_query("list_routes", UNSUPPORTED))
        }

        fn delete_route(&self, _route: &Route) -> FabricResult<()> {
            Err(FabricError::platform_mutation("delete_route", UNSUPPORTED))
        }

        fn set_link_up(&self, _name: &str) -> FabricResult<()> {
            Err(FabricError::platform_mutation("set_link_up", UNSUPPORTED))
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use unsupported::*;
