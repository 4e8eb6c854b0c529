mod route_endpoint;
